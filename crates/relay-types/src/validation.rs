//! Schema validation for raw TOML configuration and request fields.

use alloy::primitives::Address;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	/// Prefixes the field path with the name of the enclosing table.
	fn within(self, table: &str) -> Self {
		match self {
			Self::MissingField(field) => Self::MissingField(format!("{}.{}", table, field)),
			Self::InvalidValue { field, message } => Self::InvalidValue {
				field: format!("{}.{}", table, field),
				message,
			},
			Self::TypeMismatch {
				field,
				expected,
				actual,
			} => Self::TypeMismatch {
				field: format!("{}.{}", table, field),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Expected shape of a configuration value.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// 0x-prefixed 20-byte hex address.
	Address,
	/// 0x-prefixed hex blob, optionally of an exact byte length.
	Hex { len: Option<usize> },
	/// One of a fixed set of strings.
	OneOf(&'static [&'static str]),
	Table(Schema),
}

/// Extra check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub required: bool,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("required", &self.required)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			required: true,
			validator: None,
		}
	}

	pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			required: false,
			..Self::required(name, field_type)
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// A table schema.
#[derive(Debug, Default)]
pub struct Schema {
	pub fields: Vec<Field>,
}

impl Schema {
	pub fn new(fields: Vec<Field>) -> Self {
		Self { fields }
	}

	/// Validates a TOML table against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.fields {
			let Some(value) = table.get(&field.name) else {
				if field.required {
					return Err(ValidationError::MissingField(field.name.clone()));
				}
				continue;
			};

			validate_field_type(&field.name, value, &field.field_type)?;

			if let Some(validator) = &field.validator {
				validator(value).map_err(|message| ValidationError::InvalidValue {
					field: field.name.clone(),
					message,
				})?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn invalid(field: &str, message: String) -> ValidationError {
	ValidationError::InvalidValue {
		field: field.to_string(),
		message,
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "string", value))?;
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(invalid(
						field_name,
						format!("Value {} is less than minimum {}", int_val, min_val),
					));
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(invalid(
						field_name,
						format!("Value {} is greater than maximum {}", int_val, max_val),
					));
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Address => {
			let text = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "address string", value))?;
			if !text.starts_with("0x") {
				return Err(invalid(field_name, "Address must start with 0x".to_string()));
			}
			text.parse::<Address>()
				.map_err(|e| invalid(field_name, format!("Invalid address: {}", e)))?;
		},
		FieldType::Hex { len } => {
			let text = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "hex string", value))?;
			let digits = text
				.strip_prefix("0x")
				.ok_or_else(|| invalid(field_name, "Hex value must start with 0x".to_string()))?;
			let bytes = hex::decode(digits)
				.map_err(|e| invalid(field_name, format!("Invalid hex: {}", e)))?;
			if let Some(expected) = len {
				if bytes.len() != *expected {
					return Err(invalid(
						field_name,
						format!("Expected {} bytes, got {}", expected, bytes.len()),
					));
				}
			}
		},
		FieldType::OneOf(options) => {
			let text = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "string", value))?;
			if !options.contains(&text) {
				return Err(invalid(
					field_name,
					format!("Expected one of {:?}, got '{}'", options, text),
				));
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.within(field_name))?;
		},
	}

	Ok(())
}

/// A configuration schema that can validate raw TOML before deserialization.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
