use lattice_data_structures::map::HashMap;

/// Append-only name → dense-index registry, used for labels, relationship
/// types, and attribute keys.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    names: Vec<Box<str>>,
    by_name: HashMap<Box<str>, u32>,
}

impl NameRegistry {
    /// Returns the index of `name`, registering it if unseen.
    /// The second element is `true` when the name was newly registered.
    pub fn get_or_register(&mut self, name: &str) -> (u32, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }
        let id = self.names.len() as u32;
        self.names.push(name.into());
        self.by_name.insert(name.into(), id);
        (id, true)
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Registered names in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().enumerate().map(|(i, s)| (i as u32, &**s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let mut r = NameRegistry::default();
        assert_eq!(r.get_or_register("Person"), (0, true));
        assert_eq!(r.get_or_register("City"), (1, true));
        assert_eq!(r.get_or_register("Person"), (0, false));
        assert_eq!(r.id("City"), Some(1));
        assert_eq!(r.name(0), Some("Person"));
        assert_eq!(r.name(7), None);
        assert_eq!(r.len(), 2);
    }
}
