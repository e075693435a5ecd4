//! Schema validation for implementation-specific configuration tables.
//!
//! Storage and account implementations receive their `[*.implementations.<name>]`
//! table as a raw `toml::Value`. Each implementation describes the table it
//! accepts with a [`Schema`] and checks it through [`ConfigSchema`] before it
//! is constructed.

use thiserror::Error;

/// Errors that can occur while validating a configuration table.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is absent. Nested fields are reported as `outer.inner`.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// The field has the right type but a custom validator or a bound rejected it.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// The field holds a different TOML type than the schema expects.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A TOML string.
	String,
	/// A TOML integer, optionally bounded (both bounds inclusive).
	Integer { min: Option<i64>, max: Option<i64> },
	/// A TOML boolean.
	Boolean,
	/// An array whose every element has the inner type.
	Array(Box<FieldType>),
	/// A nested table checked against its own schema.
	Table(Schema),
}

/// Extra check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field with its type and optional validator.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a field with no custom validator.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a check that runs once the type check has passed.
	///
	/// # Arguments
	///
	/// * `validator` - Returns `Err(message)` to reject the value; the message
	///   ends up in [`ValidationError::InvalidValue`]
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a schema from its required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks presence of required fields, field types and custom validators,
	/// recursing into nested tables. Unknown keys are ignored.
	///
	/// # Errors
	///
	/// Returns the first [`ValidationError`] found, checking required fields
	/// before optional ones.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn type_mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String if !value.is_str() => Err(type_mismatch(field_name, "string", value)),
		FieldType::Boolean if !value.is_bool() => Err(type_mismatch(field_name, "boolean", value)),
		FieldType::String | FieldType::Boolean => Ok(()),
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| type_mismatch(field_name, "integer", value))?;
			if let Some(min_val) = min.filter(|m| int_val < *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|m| int_val > *m) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
			Ok(())
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| type_mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
			Ok(())
		},
		FieldType::Table(schema) => schema.validate(value).map_err(|e| match e {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", field_name, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", field_name, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", field_name, field),
				expected,
				actual,
			},
		}),
	}
}

/// Validator for string fields that must hold a 32-byte hex private key.
///
/// The `0x` prefix is optional. Only the shape is checked here; whether the
/// scalar is a valid secp256k1 key is left to the signer.
pub fn validate_private_key(value: &toml::Value) -> Result<(), String> {
	let key = value.as_str().ok_or("private key must be a string")?;
	let hex = crate::without_0x_prefix(key);
	if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err("private key must be 32 bytes of hex".to_string());
	}
	Ok(())
}

/// Implemented by each pluggable implementation to validate its table.
pub trait ConfigSchema: Send + Sync {
	/// Validates the implementation's configuration table.
	///
	/// # Errors
	///
	/// Returns a [`ValidationError`] describing the first offending field.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
