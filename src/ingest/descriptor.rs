//! Parse descriptors
//!
//! Map the tokens of a log line, in order, onto schema fields.

use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::schema::Schema;

/// Largest accepted number of fixed-point fraction digits (10^19 fits in u64)
pub const MAX_FIXED_POINT_DIGITS: u8 = 19;

/// What to do with one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDirective {
    /// Parse into the field at this index
    Field(usize),
    /// Ignore the token
    Skip,
    /// Parse `INT[.FRAC]` into an integer field scaled by `10^digits`
    FixedPoint { field: usize, digits: u8 },
}

/// Ordered token directives for one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDescriptor {
    directives: Vec<ParseDirective>,
}

impl ParseDescriptor {
    /// Validate raw directives against `schema`
    pub fn new(schema: &Schema, directives: Vec<ParseDirective>) -> Result<Self> {
        for directive in &directives {
            match *directive {
                ParseDirective::Skip => {}
                ParseDirective::Field(idx) => {
                    if schema.field(idx).is_none() {
                        return Err(RecordKvError::UnknownField(format!("#{}", idx)));
                    }
                }
                ParseDirective::FixedPoint { field, digits } => {
                    let f = schema
                        .field(field)
                        .ok_or_else(|| RecordKvError::UnknownField(format!("#{}", field)))?;
                    if !f.field_type().is_integer() {
                        return Err(RecordKvError::TypeMismatch {
                            field: f.name().to_string(),
                            expected: "integer field for fixed-point parsing",
                        });
                    }
                    if digits > MAX_FIXED_POINT_DIGITS {
                        return Err(RecordKvError::Config(format!(
                            "fixed-point digits for {} must be <= {}",
                            f.name(),
                            MAX_FIXED_POINT_DIGITS
                        )));
                    }
                }
            }
        }
        Ok(Self { directives })
    }

    /// Build a descriptor by field name
    pub fn builder(schema: &Arc<Schema>) -> ParseDescriptorBuilder {
        ParseDescriptorBuilder {
            schema: Arc::clone(schema),
            directives: Vec::new(),
            error: None,
        }
    }

    /// Parse a comma-separated list: `name`, `-` (skip) or `name:fixN`
    ///
    /// ```text
    /// "ts,-,uid,amount:fix2"
    /// ```
    pub fn parse_spec(schema: &Arc<Schema>, spec: &str) -> Result<Self> {
        let mut builder = Self::builder(schema);
        for item in spec.split(',').map(str::trim) {
            builder = match item.split_once(':') {
                _ if item == "-" => builder.skip(),
                None => builder.field(item),
                Some((name, fix)) => {
                    let digits = fix
                        .strip_prefix("fix")
                        .and_then(|d| d.parse::<u8>().ok())
                        .ok_or_else(|| {
                            RecordKvError::Config(format!("invalid directive '{}'", item))
                        })?;
                    builder.fixed_point(name, digits)
                }
            };
        }
        builder.build()
    }

    pub fn directives(&self) -> &[ParseDirective] {
        &self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

/// Builder for ParseDescriptor
///
/// The first lookup failure is kept and returned by `build`.
pub struct ParseDescriptorBuilder {
    schema: Arc<Schema>,
    directives: Vec<ParseDirective>,
    error: Option<RecordKvError>,
}

impl ParseDescriptorBuilder {
    /// Next token goes into `name`
    pub fn field(mut self, name: &str) -> Self {
        match self.schema.field_index(name) {
            Ok(idx) => self.directives.push(ParseDirective::Field(idx)),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Next token is ignored
    pub fn skip(mut self) -> Self {
        self.directives.push(ParseDirective::Skip);
        self
    }

    /// Next token is a decimal scaled by `10^digits` into `name`
    pub fn fixed_point(mut self, name: &str, digits: u8) -> Self {
        match self.schema.field_index(name) {
            Ok(field) => self
                .directives
                .push(ParseDirective::FixedPoint { field, digits }),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<ParseDescriptor> {
        if let Some(e) = self.error {
            return Err(e);
        }
        ParseDescriptor::new(&self.schema, self.directives)
    }
}
