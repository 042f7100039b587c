//! `yamlencode`-style rendering for Helm `values` blocks.
//!
//! Output matches the engine's encoder: keys and strings double-quoted, map
//! keys sorted, two-space indentation, sequences not indented under their key.

use crate::value::Value;

pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Map(entries) if !entries.is_empty() => write_map(&mut out, value, 0),
        Value::List(items) if !items.is_empty() => write_list(&mut out, value, 0),
        scalar => {
            out.push_str(&scalar_text(scalar));
            out.push('\n');
        }
    }
    out
}

fn write_map(out: &mut String, value: &Value, indent: usize) {
    let Value::Map(entries) = value else {
        return;
    };
    for (index, (key, child)) in entries.iter().enumerate() {
        // the first key of a map nested in a list shares the "- " line
        if index > 0 || !out.ends_with("- ") {
            out.push_str(&" ".repeat(indent));
        }
        out.push_str(&quote(key));
        out.push(':');
        write_child(out, child, indent, indent + 2);
    }
}

fn write_list(out: &mut String, value: &Value, indent: usize) {
    let Value::List(items) = value else {
        return;
    };
    for item in items {
        out.push_str(&" ".repeat(indent));
        out.push_str("- ");
        match item {
            Value::Map(entries) if !entries.is_empty() => write_map(out, item, indent + 2),
            Value::List(nested) if !nested.is_empty() => {
                out.push('\n');
                write_list(out, item, indent + 2);
            }
            scalar => {
                out.push_str(&scalar_text(scalar));
                out.push('\n');
            }
        }
    }
}

fn write_child(out: &mut String, child: &Value, list_indent: usize, map_indent: usize) {
    match child {
        Value::Map(entries) if !entries.is_empty() => {
            out.push('\n');
            write_map(out, child, map_indent);
        }
        Value::List(items) if !items.is_empty() => {
            out.push('\n');
            write_list(out, child, list_indent);
        }
        scalar => {
            out.push(' ');
            out.push_str(&scalar_text(scalar));
            out.push('\n');
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => quote(s),
        Value::List(_) => "[]".to_string(),
        Value::Map(_) => "{}".to_string(),
    }
}

fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
