//! String conversion as performed by string concatenation in the debuggee's
//! language.

use nova_jdi::{JdiValue, ThreadId, VirtualMachine};

use crate::error::EvalResult;

const TO_STRING_SIGNATURE: &str = "()Ljava/lang/String;";

/// Render `value` the way `"" + value` would.
///
/// Primitives are formatted locally. Strings are read by content; any other
/// object gets a remote `toString()` call on `thread`, so this may run
/// debuggee code.
pub fn display_string(
    vm: &dyn VirtualMachine,
    thread: ThreadId,
    value: &JdiValue,
) -> EvalResult<String> {
    Ok(match value {
        JdiValue::Null => "null".to_owned(),
        JdiValue::Void => String::new(),
        JdiValue::Boolean(v) => v.to_string(),
        JdiValue::Byte(v) => v.to_string(),
        JdiValue::Short(v) => v.to_string(),
        JdiValue::Int(v) => v.to_string(),
        JdiValue::Long(v) => v.to_string(),
        JdiValue::Char(unit) => char::from_u32(u32::from(*unit))
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
        JdiValue::Float(v) => format_floating(f64::from(*v), v.to_string()),
        JdiValue::Double(v) => format_floating(*v, v.to_string()),
        JdiValue::Object(object) if object.is_string() => vm.string_value(object)?,
        JdiValue::Object(object) => {
            match vm.invoke_method(object, "toString", TO_STRING_SIGNATURE, &[], thread)? {
                JdiValue::Object(string) => vm.string_value(&string)?,
                _ => "null".to_owned(),
            }
        }
    })
}

// `shortest` is the shortest round-trip rendering of the value in its own
// width, so `0.1f` stays `0.1` instead of the widened `0.10000000149011612`.
fn format_floating(value: f64, shortest: String) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        return scientific(&shortest);
    }
    if shortest.contains('.') {
        shortest
    } else {
        format!("{shortest}.0")
    }
}

// Rust renders large or tiny values positionally (`1e20` as
// `100000000000000000000`); rewrite them as `1.0E20`.
fn scientific(shortest: &str) -> String {
    let (sign, digits) = match shortest.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", shortest),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let all: String = format!("{int_part}{frac_part}");
    let leading_zeros = all.len() - all.trim_start_matches('0').len();
    let significant = all.trim_start_matches('0').trim_end_matches('0');
    let exponent = int_part.len() as i64 - 1 - leading_zeros as i64;
    let (first, rest) = significant.split_at(1.min(significant.len()));
    let rest = if rest.is_empty() { "0" } else { rest };
    format!("{sign}{first}.{rest}E{exponent}")
}
