/// Display name for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagComponent(pub String);

impl TagComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
