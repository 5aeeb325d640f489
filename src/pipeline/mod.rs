//! Pipeline parser for the `action` query parameter.
//!
//! ```text
//! resize!800,400,1|watermark!https%3A%2F%2Fcdn.test%2Flogo.png,10,10
//! ```
//!
//! Segments are separated by `|`, the operation name is everything before
//! the first `!`, and the remainder is split on `,` into raw parameters.
//! Parsing is purely syntactic: names are checked against the operation
//! table at dispatch time, and parameters are interpreted by the engine.

/// One parsed step of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub raw_params: Vec<String>,
}

impl OperationDescriptor {
    /// Parse a single non-empty segment such as `resize!800,400,1`.
    pub fn parse(segment: &str) -> Self {
        let (name, params) = segment.split_once('!').unwrap_or((segment, ""));
        let raw_params = if params.is_empty() {
            Vec::new()
        } else {
            params.split(',').map(str::to_string).collect()
        };

        Self {
            name: name.to_string(),
            raw_params,
        }
    }
}

/// Ordered sequence of operations, applied left to right
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<OperationDescriptor>,
}

impl Pipeline {
    pub fn parse(action: &str) -> Self {
        Self {
            steps: parse_pipeline(action),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[OperationDescriptor] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OperationDescriptor> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a OperationDescriptor;
    type IntoIter = std::slice::Iter<'a, OperationDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Split an `action` string into operation descriptors, dropping empty
/// segments so leading, trailing and doubled `|` are tolerated.
pub fn parse_pipeline(action: &str) -> Vec<OperationDescriptor> {
    action
        .split('|')
        .filter(|segment| !segment.is_empty())
        .map(OperationDescriptor::parse)
        .collect()
}
