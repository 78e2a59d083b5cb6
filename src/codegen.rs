//! Emit a finished [`Mphf`] as a self-contained Rust source file.
//!
//! The generated module holds the salt tables, the resolution array, and the
//! key table as statics, plus a `lookup` function equivalent to
//! [`Mphf::get`]. Useful for baking a fixed key set into a binary with no
//! runtime construction; the in-memory artifact remains the primary
//! interface.

use crate::Mphf;
use std::fmt::Write;

/// Formatting knobs for the emitted array literals.
#[derive(Debug, Clone)]
pub struct Style {
    /// Maximum line width before an array literal wraps.
    pub width: usize,
    /// Indentation of wrapped literal lines.
    pub indent: usize,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: 76,
            indent: 4,
        }
    }
}

/// Render `mph` as a standalone Rust module.
pub fn rust_source(mph: &Mphf, style: &Style) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// Minimal perfect hash function generated by chm_hash. Do not edit."
    );
    out.push('\n');
    let _ = writeln!(out, "pub const NK: usize = {};", mph.len());
    let _ = writeln!(out, "pub const NG: u32 = {};", mph.ng);
    out.push('\n');

    out.push_str(&static_array("S1", "u32", &nums(&mph.s1), style));
    out.push_str(&static_array("S2", "u32", &nums(&mph.s2), style));
    out.push_str(&static_array("G", "u32", &nums(&mph.g), style));

    let key_lits: Vec<String> = mph.keys.iter().map(|k| byte_literal(k)).collect();
    out.push_str(&static_array("KEYS", "&[u8]", &key_lits, style));

    out.push_str(LOOKUP_BODY);
    out
}

const LOOKUP_BODY: &str = r#"
fn salted_sum(salt: &[u32], key: &[u8]) -> u32 {
    let mut acc = 0u64;
    for (&s, &b) in salt.iter().zip(key) {
        acc = (acc + u64::from(s) * u64::from(b)) % u64::from(NG);
    }
    acc as u32
}

/// Verified lookup over the baked-in key set.
pub fn lookup(key: &[u8]) -> Option<u32> {
    let f1 = salted_sum(&S1, key) as usize;
    let f2 = salted_sum(&S2, key) as usize;
    let candidate = ((u64::from(G[f1]) + u64::from(G[f2])) % u64::from(NG)) as u32;
    let slot = *KEYS.get(candidate as usize)?;
    if slot == key { Some(candidate) } else { None }
}
"#;

fn nums(values: &[u32]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn static_array(name: &str, ty: &str, items: &[String], style: &Style) -> String {
    if items.is_empty() {
        format!("static {name}: [{ty}; 0] = [];\n")
    } else {
        format!(
            "static {name}: [{ty}; {}] = [\n{}\n];\n",
            items.len(),
            wrapped_list(items, style)
        )
    }
}

/// Comma-separated items, wrapped to `style.width` columns.
fn wrapped_list(items: &[String], style: &Style) -> String {
    let indent = " ".repeat(style.indent);
    let mut out = indent.clone();
    let mut pos = style.indent;
    for (i, item) in items.iter().enumerate() {
        if pos > style.indent && pos + item.len() + 2 > style.width {
            out.push('\n');
            out.push_str(&indent);
            pos = style.indent;
        }
        out.push_str(item);
        pos += item.len();
        if i + 1 < items.len() {
            out.push_str(", ");
            pos += 2;
        } else {
            out.push(',');
        }
    }
    out
}

/// Rust byte-string literal for arbitrary key bytes.
fn byte_literal(key: &[u8]) -> String {
    let mut lit = String::from("b\"");
    for &b in key {
        match b {
            b'"' => lit.push_str("\\\""),
            b'\\' => lit.push_str("\\\\"),
            0x20..=0x7e => lit.push(b as char),
            _ => {
                let _ = write!(lit, "\\x{b:02x}");
            }
        }
    }
    lit.push('"');
    lit
}
