//! Scalar message values and positional message formatting
//!
//! Messages may be written as printf-style templates. The data passed with a
//! message is substituted into the template before the message is stored:
//!
//! ```
//! use reinhardt_flash::format::{FormatArgs, format_message};
//!
//! let text = format_message("Saved %d of %d items", &FormatArgs::from(vec![3, 5])).unwrap();
//! assert_eq!(text, "Saved 3 of 5 items");
//!
//! let text = format_message("%2$s before %1$s", &FormatArgs::from(vec!["b", "a"])).unwrap();
//! assert_eq!(text, "a before b");
//! ```

use crate::error::FlashError;
use serde_json::Value;
use std::fmt;

/// A scalar message value
///
/// Flash messages and their format data are restricted to scalars. Anything
/// else (lists, maps, null) is rejected with [`FlashError::InvalidMessage`]
/// when converted from JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
	Str(String),
	Int(i64),
	Float(f64),
	Bool(bool),
}

impl MessageValue {
	fn to_int(&self) -> i64 {
		match self {
			Self::Str(s) => leading_int(s),
			Self::Int(i) => *i,
			Self::Float(f) => float_to_int(*f),
			Self::Bool(b) => i64::from(*b),
		}
	}

	fn to_float(&self) -> f64 {
		match self {
			Self::Str(s) => leading_float(s),
			Self::Int(i) => *i as f64,
			Self::Float(f) => *f,
			Self::Bool(b) => f64::from(u8::from(*b)),
		}
	}
}

impl fmt::Display for MessageValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(s) => f.write_str(s),
			Self::Int(i) => write!(f, "{}", i),
			Self::Float(v) if v.is_nan() => f.write_str("NAN"),
			Self::Float(v) if v.is_infinite() => {
				f.write_str(if *v > 0.0 { "INF" } else { "-INF" })
			}
			Self::Float(v) => f.write_str(&float_display(*v)),
			// true renders as "1", false as the empty string
			Self::Bool(true) => f.write_str("1"),
			Self::Bool(false) => Ok(()),
		}
	}
}

/// Significant digits kept when a float is rendered as text
const FLOAT_DIGITS: i32 = 14;

/// Render a finite float with [`FLOAT_DIGITS`] significant digits
///
/// Fixed notation is used for exponents in `-4..FLOAT_DIGITS`, otherwise the
/// exponent form `1.0E+20`. Trailing zeros are dropped.
fn float_display(value: f64) -> String {
	let scientific = format!("{:.*e}", (FLOAT_DIGITS - 1) as usize, value);
	let Some((mantissa, exponent)) = scientific.split_once('e') else {
		return value.to_string();
	};
	let Ok(exponent) = exponent.parse::<i32>() else {
		return value.to_string();
	};

	if exponent < -4 || exponent >= FLOAT_DIGITS {
		let mantissa = trim_fraction(mantissa);
		let point = if mantissa.contains('.') { "" } else { ".0" };
		let sign = if exponent < 0 { '-' } else { '+' };
		return format!("{}{}E{}{}", mantissa, point, sign, exponent.abs());
	}

	// Re-render the already rounded value in fixed notation
	let rounded = scientific.parse::<f64>().unwrap_or(value);
	let decimals = (FLOAT_DIGITS - 1 - exponent).max(0) as usize;
	trim_fraction(&format!("{:.*}", decimals, rounded)).to_string()
}

fn trim_fraction(text: &str) -> &str {
	if text.contains('.') {
		text.trim_end_matches('0').trim_end_matches('.')
	} else {
		text
	}
}

impl From<String> for MessageValue {
	fn from(s: String) -> Self {
		Self::Str(s)
	}
}

impl From<&str> for MessageValue {
	fn from(s: &str) -> Self {
		Self::Str(s.to_string())
	}
}

impl From<&String> for MessageValue {
	fn from(s: &String) -> Self {
		Self::Str(s.clone())
	}
}

impl From<bool> for MessageValue {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<f32> for MessageValue {
	fn from(v: f32) -> Self {
		Self::Float(f64::from(v))
	}
}

impl From<f64> for MessageValue {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

macro_rules! impl_from_int {
	($($t:ty),*) => {
		$(
			impl From<$t> for MessageValue {
				fn from(v: $t) -> Self {
					Self::Int(i64::from(v))
				}
			}
		)*
	};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_from_wide_int {
	($($t:ty),*) => {
		$(
			/// Values above `i64::MAX` saturate
			impl From<$t> for MessageValue {
				fn from(v: $t) -> Self {
					Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
				}
			}
		)*
	};
}

impl_from_wide_int!(u64, usize);

impl TryFrom<Value> for MessageValue {
	type Error = FlashError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		MessageValue::try_from(&value)
	}
}

impl TryFrom<&Value> for MessageValue {
	type Error = FlashError;

	fn try_from(value: &Value) -> Result<Self, Self::Error> {
		match value {
			Value::String(s) => Ok(Self::Str(s.clone())),
			Value::Bool(b) => Ok(Self::Bool(*b)),
			Value::Number(n) => match n.as_i64() {
				Some(i) => Ok(Self::Int(i)),
				None => Ok(Self::Float(n.as_f64().unwrap_or_default())),
			},
			Value::Null => Err(FlashError::InvalidMessage("null".to_string())),
			Value::Array(_) => Err(FlashError::InvalidMessage("array".to_string())),
			Value::Object(_) => Err(FlashError::InvalidMessage("object".to_string())),
		}
	}
}

/// Data interpolated into a message template
///
/// A single value fills one substitution; a sequence fills several positional
/// substitutions in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FormatArgs {
	#[default]
	None,
	One(MessageValue),
	Many(Vec<MessageValue>),
}

impl FormatArgs {
	/// Whether there is nothing to interpolate
	///
	/// An empty string or empty sequence counts as no data, in which case the
	/// template is stored verbatim.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::None => true,
			Self::One(MessageValue::Str(s)) => s.is_empty(),
			Self::One(_) => false,
			Self::Many(values) => values.is_empty(),
		}
	}

	fn as_slice(&self) -> &[MessageValue] {
		match self {
			Self::None => &[],
			Self::One(value) => std::slice::from_ref(value),
			Self::Many(values) => values,
		}
	}

	/// Convert JSON data into format arguments
	///
	/// `null` means no data, a scalar is a single argument, and an array of
	/// scalars is a positional argument list.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_flash::format::{FormatArgs, MessageValue};
	/// use serde_json::json;
	///
	/// let args = FormatArgs::from_json(&json!(["a", 2])).unwrap();
	/// assert_eq!(
	///     args,
	///     FormatArgs::Many(vec![MessageValue::from("a"), MessageValue::from(2)])
	/// );
	/// assert!(FormatArgs::from_json(&json!({"k": 1})).is_err());
	/// ```
	pub fn from_json(value: &Value) -> Result<Self, FlashError> {
		match value {
			Value::Null => Ok(Self::None),
			Value::Array(items) => items
				.iter()
				.map(MessageValue::try_from)
				.collect::<Result<Vec<_>, _>>()
				.map(Self::Many),
			other => MessageValue::try_from(other).map(Self::One),
		}
	}
}

impl From<()> for FormatArgs {
	fn from(_: ()) -> Self {
		Self::None
	}
}

impl<T: Into<MessageValue>> From<Vec<T>> for FormatArgs {
	fn from(values: Vec<T>) -> Self {
		Self::Many(values.into_iter().map(Into::into).collect())
	}
}

impl From<MessageValue> for FormatArgs {
	fn from(value: MessageValue) -> Self {
		Self::One(value)
	}
}

macro_rules! impl_args_from_scalar {
	($($t:ty),*) => {
		$(
			impl From<$t> for FormatArgs {
				fn from(v: $t) -> Self {
					Self::One(MessageValue::from(v))
				}
			}
		)*
	};
}

impl_args_from_scalar!(
	String, &str, &String, bool, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize
);

/// Template errors
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
	#[error("{required} arguments are required, {given} given")]
	TooFewArguments { required: usize, given: usize },

	#[error("Argument number must be greater than zero")]
	ZeroArgumentNumber,

	#[error("Unknown format specifier \"{0}\"")]
	UnknownConversion(char),

	#[error("Missing format specifier at end of string")]
	MissingSpecifier,
}

#[derive(Debug, Default)]
struct Spec {
	left_align: bool,
	plus_sign: bool,
	pad: Option<char>,
	width: usize,
	precision: Option<usize>,
}

/// Substitute `args` into `template`
///
/// When `args` is empty the template is returned untouched, so a literal `%`
/// in a plain message needs no escaping.
///
/// # Examples
///
/// ```
/// use reinhardt_flash::format::{FormatArgs, format_message};
///
/// assert_eq!(format_message("100% done", &FormatArgs::None).unwrap(), "100% done");
/// assert_eq!(format_message("%05.1f", &FormatArgs::from(7.26)).unwrap(), "007.3");
/// assert_eq!(format_message("[%'*8s]", &FormatArgs::from("hi")).unwrap(), "[******hi]");
/// ```
pub fn format_message(template: &str, args: &FormatArgs) -> Result<String, FormatError> {
	if args.is_empty() {
		return Ok(template.to_string());
	}

	let args = args.as_slice();
	let mut output = String::with_capacity(template.len());
	let mut chars = template.chars().peekable();
	let mut next_arg = 0usize;

	while let Some(c) = chars.next() {
		if c != '%' {
			output.push(c);
			continue;
		}

		match chars.peek() {
			None => return Err(FormatError::MissingSpecifier),
			Some('%') => {
				chars.next();
				output.push('%');
				continue;
			}
			Some(_) => {}
		}

		// Argument number (`%2$s`) or width digits; only a trailing `$`
		// distinguishes the two.
		let mut digits = String::new();
		let mut lookahead = chars.clone();
		while let Some(d) = lookahead.peek().copied().filter(char::is_ascii_digit) {
			digits.push(d);
			lookahead.next();
		}
		let arg_index = if !digits.is_empty() && lookahead.peek() == Some(&'$') {
			lookahead.next();
			chars = lookahead;
			let number: usize = digits.parse().unwrap_or(usize::MAX);
			if number == 0 {
				return Err(FormatError::ZeroArgumentNumber);
			}
			Some(number - 1)
		} else {
			None
		};

		let mut spec = Spec::default();
		loop {
			match chars.peek() {
				Some('-') => spec.left_align = true,
				Some('+') => spec.plus_sign = true,
				Some('0') => spec.pad = Some('0'),
				Some(' ') => spec.pad = Some(' '),
				Some('\'') => {
					chars.next();
					match chars.next() {
						Some(p) => spec.pad = Some(p),
						None => return Err(FormatError::MissingSpecifier),
					}
					continue;
				}
				_ => break,
			}
			chars.next();
		}

		spec.width = take_number(&mut chars).unwrap_or(0);
		if chars.peek() == Some(&'.') {
			chars.next();
			spec.precision = Some(take_number(&mut chars).unwrap_or(0));
		}

		let conversion = chars.next().ok_or(FormatError::MissingSpecifier)?;
		let index = match arg_index {
			Some(i) => i,
			None => {
				next_arg += 1;
				next_arg - 1
			}
		};
		let value = args.get(index).ok_or(FormatError::TooFewArguments {
			required: index + 1,
			given: args.len(),
		})?;

		output.push_str(&convert(conversion, value, &spec)?);
	}

	Ok(output)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
	let mut digits = String::new();
	while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
		digits.push(d);
		chars.next();
	}
	digits.parse().ok()
}

fn convert(conversion: char, value: &MessageValue, spec: &Spec) -> Result<String, FormatError> {
	let precision = spec.precision;
	let formatted = match conversion {
		's' => {
			let text = value.to_string();
			let text = match precision {
				Some(p) => text.chars().take(p).collect(),
				None => text,
			};
			return Ok(pad(text, spec, false));
		}
		'd' => signed(value.to_int().to_string(), spec),
		'u' => (value.to_int() as u64).to_string(),
		'f' | 'F' => signed(format!("{:.*}", precision.unwrap_or(6), value.to_float()), spec),
		'e' | 'E' => {
			let text = scientific(value.to_float(), precision.unwrap_or(6));
			let text = if conversion == 'E' {
				text.to_uppercase()
			} else {
				text
			};
			signed(text, spec)
		}
		'b' => format!("{:b}", value.to_int() as u64),
		'o' => format!("{:o}", value.to_int() as u64),
		'x' => format!("{:x}", value.to_int() as u64),
		'X' => format!("{:X}", value.to_int() as u64),
		'c' => {
			// Width and padding do not apply to characters
			let code = (value.to_int() as u64 & 0xFF) as u32;
			return Ok(char::from_u32(code).map(String::from).unwrap_or_default());
		}
		other => return Err(FormatError::UnknownConversion(other)),
	};

	Ok(pad(formatted, spec, true))
}

fn signed(text: String, spec: &Spec) -> String {
	if spec.plus_sign && !text.starts_with('-') {
		format!("+{}", text)
	} else {
		text
	}
}

fn pad(text: String, spec: &Spec, numeric: bool) -> String {
	let len = text.chars().count();
	if len >= spec.width {
		return text;
	}

	let fill_char = spec.pad.unwrap_or(' ');
	let fill: String = std::iter::repeat_n(fill_char, spec.width - len).collect();

	if spec.left_align {
		return format!("{}{}", text, fill);
	}

	// Zero padding goes between the sign and the digits
	if numeric && fill_char == '0' && (text.starts_with('-') || text.starts_with('+')) {
		let (sign, digits) = text.split_at(1);
		return format!("{}{}{}", sign, fill, digits);
	}

	format!("{}{}", fill, text)
}

fn scientific(value: f64, precision: usize) -> String {
	let text = format!("{:.*e}", precision, value);
	match text.split_once('e') {
		Some((mantissa, exponent)) => {
			let exponent: i32 = exponent.parse().unwrap_or(0);
			format!("{}e{:+}", mantissa, exponent)
		}
		None => text,
	}
}

fn float_to_int(value: f64) -> i64 {
	if value.is_finite() {
		value.trunc() as i64
	} else {
		0
	}
}

/// Length of the leading numeric prefix of `s` (after leading whitespace)
fn numeric_prefix(s: &str) -> &str {
	let s = s.trim_start();
	let bytes = s.as_bytes();
	let mut end = 0;

	if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
		end += 1;
	}
	let int_start = end;
	while bytes.get(end).is_some_and(u8::is_ascii_digit) {
		end += 1;
	}
	let mut has_digits = end > int_start;

	if bytes.get(end) == Some(&b'.') {
		let frac_start = end + 1;
		let mut frac_end = frac_start;
		while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
			frac_end += 1;
		}
		if frac_end > frac_start || has_digits {
			has_digits = true;
			end = frac_end;
		}
	}
	if !has_digits {
		return "";
	}

	if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
		let mut exp_end = end + 1;
		if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
			exp_end += 1;
		}
		let digits_start = exp_end;
		while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
			exp_end += 1;
		}
		if exp_end > digits_start {
			end = exp_end;
		}
	}

	&s[..end]
}

fn leading_float(s: &str) -> f64 {
	numeric_prefix(s).parse().unwrap_or(0.0)
}

fn leading_int(s: &str) -> i64 {
	let prefix = numeric_prefix(s);
	prefix
		.parse::<i64>()
		.unwrap_or_else(|_| float_to_int(prefix.parse().unwrap_or(0.0)))
}
