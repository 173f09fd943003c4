use std::fmt;

/// Identifier of an image in the input sequence.
///
/// Frames are owned by the surrounding pipeline; the initializer only keeps their ids.
/// Integer ids are stored in their decimal form so that `FrameId::from(3)` and
/// `FrameId::from("3")` name the same frame.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Create a frame id from anything convertible into a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for FrameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&FrameId> for FrameId {
    fn from(id: &FrameId) -> Self {
        id.clone()
    }
}

impl From<u64> for FrameId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for FrameId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_from_integer_matches_string() {
        assert_eq!(FrameId::from(42u64), FrameId::from("42"));
        assert_eq!(FrameId::from(7usize).as_str(), "7");
    }

    #[test]
    fn test_frame_id_serde_transparent() -> Result<(), Box<dyn std::error::Error>> {
        let id = FrameId::new("F0");
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, "\"F0\"");
        let back: FrameId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }
}
