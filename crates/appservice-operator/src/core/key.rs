use std::fmt;

use k8_types::{InputObjectMeta, ObjectMeta};

/// Identifies an AppService instance; children share the same key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn as_input_meta(&self) -> InputObjectMeta {
        InputObjectMeta::named(&self.name, &self.namespace)
    }
}

impl From<&ObjectMeta> for ObjectKey {
    fn from(meta: &ObjectMeta) -> Self {
        Self::new(&meta.namespace, &meta.name)
    }
}

impl From<&InputObjectMeta> for ObjectKey {
    fn from(meta: &InputObjectMeta) -> Self {
        Self::new(&meta.namespace, &meta.name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod test {

    use k8_types::ObjectMeta;

    use super::ObjectKey;

    #[test]
    fn test_key_from_meta() {
        let meta = ObjectMeta {
            name: "web".to_owned(),
            namespace: "prod".to_owned(),
            ..Default::default()
        };
        let key = ObjectKey::from(&meta);
        assert_eq!(key, ObjectKey::new("prod", "web"));
        assert_eq!(key.to_string(), "prod/web");
    }
}
