use sink_api::{validate_object_root, CodecSelection, DEFAULT_OBJECT_ROOT};

use crate::Result;

/// Process-wide settings every node reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOptions {
    object_root: String,
    codecs: CodecSelection,
}

impl SinkOptions {
    /// Validated options; `object_root` prefixes every served object path
    pub fn new(object_root: impl Into<String>, codecs: CodecSelection) -> Result<Self> {
        let object_root = object_root.into();
        validate_object_root(&object_root)?;
        Ok(Self {
            object_root,
            codecs,
        })
    }

    pub fn object_root(&self) -> &str {
        &self.object_root
    }

    /// Codecs registered by [`AdapterNode::prepare`](crate::AdapterNode::prepare)
    pub fn codecs(&self) -> &CodecSelection {
        &self.codecs
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            object_root: DEFAULT_OBJECT_ROOT.to_string(),
            codecs: CodecSelection::default(),
        }
    }
}

/// Bus connection plus options, owned by the directory and lent to each node
pub struct SinkContext<B> {
    bus: B,
    options: SinkOptions,
}

impl<B> SinkContext<B> {
    pub fn new(bus: B, options: SinkOptions) -> Self {
        Self { bus, options }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn options(&self) -> &SinkOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateError;

    #[test]
    fn test_default_options() {
        let options = SinkOptions::default();
        assert_eq!(options.object_root(), "/test");
        assert_eq!(options.codecs(), &CodecSelection::default());
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        let result = SinkOptions::new("test/", CodecSelection::sbc_only());
        assert!(matches!(result, Err(StateError::Api(_))));
    }
}
