use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;

/// 将驼峰/帕斯卡命名转换为小写下划线形式，如 `notFound` -> `not_found`。
///
/// 每个前面紧跟单词字符的大写字母前都会插入下划线，所以 `HTTPError` 会变成 `h_t_t_p_error`。
pub fn underscore(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_uppercase() {
            if let Some(p) = prev {
                if p.is_alphanumeric() || p == '_' {
                    result.push('_');
                }
            }
        }
        result.extend(c.to_lowercase());
        prev = Some(c);
    }
    result
}

/// 按第一个 `.` 拆分出插件前缀，`Blog.custom` -> `(Some("Blog"), "custom")`
pub fn plugin_split(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((plugin, rest)) => (Some(plugin), rest),
        None => (None, name),
    }
}

/// 非 ASCII 字符一律写成 `\uXXXX`（BMP 以外为代理对），其余与默认格式相同
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
                continue;
            }
            for unit in c.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
        }
        Ok(())
    }
}

/// 编码为只含 ASCII 的 JSON。HTTP 头的值按 ISO-8859-1 处理，原样写入 UTF-8 会让客户端读到乱码。
pub fn to_ascii_json<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let mut ser = serde_json::Serializer::with_formatter(Vec::with_capacity(128), AsciiFormatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&ser.into_inner()).into_owned())
}
