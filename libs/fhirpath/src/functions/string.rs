//! String manipulation functions
//!
//! All of these require a singleton string focus; an empty focus propagates
//! to an empty result, per the `{}.matches('x')` resolution in DESIGN.md.

use base64::{engine::general_purpose, Engine};
use regex::Regex;

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

pub fn length(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::integer(
        s.chars().count() as i64
    )))
}

pub fn substring(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(start) = helpers::singleton_integer(cc, helpers::eager(cc, args, 0)?, "start")?
    else {
        return Ok(Collection::empty());
    };

    let chars: Vec<char> = s.chars().collect();
    // A start at or past the end (or negative) yields empty.
    if start < 0 || start as usize >= chars.len() {
        return Ok(Collection::empty());
    }
    let start = start as usize;

    let length = match args.get(1) {
        Some(arg) => {
            let Some(length) = helpers::singleton_integer(cc, arg.eager(cc)?, "length")? else {
                return Ok(Collection::empty());
            };
            if length <= 0 {
                return Ok(Collection::empty());
            }
            length as usize
        }
        None => chars.len() - start,
    };

    let result: String = chars[start..].iter().take(length).collect();
    Ok(Collection::singleton(Value::string(result)))
}

pub fn index_of(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(needle) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    let index = match s.find(needle.as_ref()) {
        // Byte offset back to character offset.
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(Collection::singleton(Value::integer(index)))
}

pub fn last_index_of(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(needle) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    let index = match s.rfind(needle.as_ref()) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(Collection::singleton(Value::integer(index)))
}

pub fn starts_with(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(prefix) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    Ok(helpers::boolean(s.starts_with(prefix.as_ref())))
}

pub fn ends_with(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(suffix) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    Ok(helpers::boolean(s.ends_with(suffix.as_ref())))
}

pub fn contains(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(needle) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    Ok(helpers::boolean(s.contains(needle.as_ref())))
}

pub fn upper(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::string(s.to_uppercase())))
}

pub fn lower(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::string(s.to_lowercase())))
}

pub fn replace(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(pattern) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "pattern")?
    else {
        return Ok(Collection::empty());
    };
    let Some(substitution) =
        helpers::singleton_string(cc, helpers::eager(cc, args, 1)?, "substitution")?
    else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::string(
        s.replace(pattern.as_ref(), substitution.as_ref()),
    )))
}

fn compile_regex(cc: &CallContext, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| cc.eval_error(format!("invalid regular expression '{pattern}': {e}")))
}

pub fn matches(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(pattern) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "pattern")?
    else {
        return Ok(Collection::empty());
    };
    let regex = compile_regex(cc, &pattern)?;
    Ok(helpers::boolean(regex.is_match(&s)))
}

pub fn replace_matches(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(pattern) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "pattern")?
    else {
        return Ok(Collection::empty());
    };
    let Some(substitution) =
        helpers::singleton_string(cc, helpers::eager(cc, args, 1)?, "substitution")?
    else {
        return Ok(Collection::empty());
    };
    let regex = compile_regex(cc, &pattern)?;
    Ok(Collection::singleton(Value::string(
        regex.replace_all(&s, substitution.as_ref()).into_owned(),
    )))
}

pub fn to_chars(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    Ok(s.chars().map(|c| Value::string(c.to_string())).collect())
}

pub fn trim(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::string(s.trim())))
}

pub fn split(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(separator) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "separator")?
    else {
        return Ok(Collection::empty());
    };
    Ok(s.split(separator.as_ref()).map(Value::string).collect())
}

pub fn join(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let separator = match args.first() {
        Some(arg) => helpers::singleton_string(cc, arg.eager(cc)?, "separator")?
            .map(|s| s.to_string())
            .unwrap_or_default(),
        None => String::new(),
    };

    let mut parts = Vec::with_capacity(focus.len());
    for item in focus.iter() {
        match item {
            Value::String(s) => parts.push(s.to_string()),
            _ => return Err(cc.type_error("join() requires a collection of strings")),
        }
    }
    Ok(Collection::singleton(Value::string(
        parts.join(&separator),
    )))
}

pub fn encode(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(format) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "format")?
    else {
        return Ok(Collection::empty());
    };
    let encoded = match format.as_ref() {
        "hex" => hex::encode(s.as_bytes()),
        "base64" => general_purpose::STANDARD.encode(s.as_bytes()),
        "urlbase64" => general_purpose::URL_SAFE.encode(s.as_bytes()),
        "url" => urlencoding::encode(&s).into_owned(),
        other => {
            return Err(cc.arg_error(format!("unsupported encoding '{other}'")));
        }
    };
    Ok(Collection::singleton(Value::string(encoded)))
}

pub fn decode(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(format) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "format")?
    else {
        return Ok(Collection::empty());
    };
    let bytes = match format.as_ref() {
        "hex" => hex::decode(s.as_bytes())
            .map_err(|e| cc.eval_error(format!("invalid hex input: {e}")))?,
        "base64" => general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(|e| cc.eval_error(format!("invalid base64 input: {e}")))?,
        "urlbase64" => general_purpose::URL_SAFE
            .decode(s.as_bytes())
            .map_err(|e| cc.eval_error(format!("invalid base64 input: {e}")))?,
        "url" => {
            let decoded = urlencoding::decode(&s)
                .map_err(|e| cc.eval_error(format!("invalid url-encoded input: {e}")))?;
            return Ok(Collection::singleton(Value::string(decoded.into_owned())));
        }
        other => {
            return Err(cc.arg_error(format!("unsupported encoding '{other}'")));
        }
    };
    let decoded = String::from_utf8(bytes)
        .map_err(|e| cc.eval_error(format!("decoded bytes are not valid UTF-8: {e}")))?;
    Ok(Collection::singleton(Value::string(decoded)))
}

pub fn escape(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(target) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "target")?
    else {
        return Ok(Collection::empty());
    };
    let escaped = match target.as_ref() {
        "html" => html_escape::encode_safe(s.as_ref()).into_owned(),
        "json" => {
            let quoted = serde_json::to_string(s.as_ref())
                .map_err(|e| cc.eval_error(format!("cannot escape string: {e}")))?;
            quoted[1..quoted.len() - 1].to_string()
        }
        other => return Err(cc.arg_error(format!("unsupported escape target '{other}'"))),
    };
    Ok(Collection::singleton(Value::string(escaped)))
}

pub fn unescape(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(s) = helpers::singleton_string(cc, &focus, "input")? else {
        return Ok(Collection::empty());
    };
    let Some(target) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "target")?
    else {
        return Ok(Collection::empty());
    };
    let unescaped = match target.as_ref() {
        "html" => html_escape::decode_html_entities(s.as_ref()).into_owned(),
        "json" => serde_json::from_str::<String>(&format!("\"{s}\""))
            .map_err(|e| cc.eval_error(format!("cannot unescape string: {e}")))?,
        other => return Err(cc.arg_error(format!("unsupported escape target '{other}'"))),
    };
    Ok(Collection::singleton(Value::string(unescaped)))
}
