use lattice_primitives::AttrId;
use smallvec::SmallVec;

use crate::Value;

/// The key/value attributes of one node or edge.
///
/// Entity attribute sets are almost always tiny, so they live inline as an
/// association list rather than a map.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeSet {
    entries: SmallVec<[(AttrId, Value); 2]>,
}

impl AttributeSet {
    pub fn get(&self, attr: AttrId) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(id, _)| *id == attr)
            .map(|(_, v)| v)
    }

    /// Sets `attr`, returning the previous value if any. Setting `Null`
    /// removes the attribute.
    pub fn set(&mut self, attr: AttrId, value: Value) -> Option<Value> {
        if value.is_null() {
            return self.remove(attr);
        }
        match self.entries.iter_mut().find(|(id, _)| *id == attr) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((attr, value));
                None
            }
        }
    }

    pub fn remove(&mut self, attr: AttrId) -> Option<Value> {
        let pos = self.entries.iter().position(|(id, _)| *id == attr)?;
        Some(self.entries.swap_remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttrId, &Value)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }
}

impl FromIterator<(AttrId, Value)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (AttrId, Value)>>(iter: T) -> Self {
        let mut set = Self::default();
        for (attr, value) in iter {
            set.set(attr, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut attrs = AttributeSet::default();
        assert_eq!(attrs.set(AttrId(0), Value::Int(7)), None);
        assert_eq!(attrs.set(AttrId(0), Value::Int(9)), Some(Value::Int(7)));
        assert_eq!(attrs.get(AttrId(0)), Some(&Value::Int(9)));
        assert_eq!(attrs.remove(AttrId(0)), Some(Value::Int(9)));
        assert!(attrs.is_empty());
    }

    #[test]
    fn setting_null_removes() {
        let mut attrs: AttributeSet = [(AttrId(1), Value::from("x"))].into_iter().collect();
        attrs.set(AttrId(1), Value::Null);
        assert_eq!(attrs.get(AttrId(1)), None);
    }
}
