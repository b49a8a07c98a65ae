//! Logged operation
//!
//! An operation is the command name followed by its arguments, all as raw bytes.

use bytes::Bytes;
use std::fmt;

/// A state-mutating operation as recorded in the AOF
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Operation {
    fields: Vec<Bytes>,
}

impl Operation {
    /// Create an operation from a command name and its arguments
    pub fn new<I, B>(name: impl Into<Bytes>, args: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut fields = vec![name.into()];
        fields.extend(args.into_iter().map(Into::into));
        Operation { fields }
    }

    /// Create an operation from raw fields (field 0 is the command name)
    pub fn from_fields(fields: Vec<Bytes>) -> Self {
        Operation { fields }
    }

    /// Command name, if any
    pub fn name(&self) -> Option<&Bytes> {
        self.fields.first()
    }

    /// Arguments (everything after the command name)
    pub fn args(&self) -> &[Bytes] {
        self.fields.get(1..).unwrap_or(&[])
    }

    /// All fields, name included
    pub fn fields(&self) -> &[Bytes] {
        &self.fields
    }

    /// Consume the operation and return its fields
    pub fn into_fields(self) -> Vec<Bytes> {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .name()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        write!(f, "{}({} args)", name, self.args().len())
    }
}
