use encoding_rs::{Encoding, UTF_8};

/// 解码原始字节：优先按 UTF-8（去掉 BOM），失败时读取 `$DWGCODEPAGE` 选择单字节编码。
pub(crate) fn decode(bytes: &[u8]) -> (String, &'static Encoding) {
    let without_bom = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(without_bom) {
        return (text.to_string(), UTF_8);
    }

    let encoding = sniff_code_page(bytes)
        .map(|name| encoding_for(&name))
        .unwrap_or(encoding_rs::WINDOWS_1251);
    let (text, _) = encoding.decode_without_bom_handling(without_bom);
    (text.into_owned(), encoding)
}

/// 按读取时的编码写回，保证俄文等非 ASCII 图层名/文字不被破坏。
pub(crate) fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    if encoding == UTF_8 {
        return text.as_bytes().to_vec();
    }
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        tracing::warn!(encoding = encoding.name(), "部分字符无法用原编码表示，已替换");
    }
    bytes.into_owned()
}

/// 头部变量一般是 ASCII，可以直接在原始字节上查找。
fn sniff_code_page(bytes: &[u8]) -> Option<String> {
    let ascii = String::from_utf8_lossy(bytes);
    let mut lines = ascii.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if line == "$DWGCODEPAGE" {
            // 紧随其后是组码 3 与编码名
            let _code = lines.next()?;
            return lines.next().map(str::to_string);
        }
        if line == "ENTITIES" {
            break;
        }
    }
    None
}

pub(crate) fn encoding_for(code_page: &str) -> &'static Encoding {
    match code_page.to_ascii_lowercase().as_str() {
        "ansi_1250" | "dos852" => encoding_rs::WINDOWS_1250,
        "ansi_1251" => encoding_rs::WINDOWS_1251,
        "ansi_1253" | "dos869" => encoding_rs::WINDOWS_1253,
        "ansi_1254" | "dos857" => encoding_rs::WINDOWS_1254,
        "ansi_1255" => encoding_rs::WINDOWS_1255,
        "ansi_1256" => encoding_rs::WINDOWS_1256,
        "ansi_1257" => encoding_rs::WINDOWS_1257,
        "ansi_1258" => encoding_rs::WINDOWS_1258,
        "ansi_874" => encoding_rs::WINDOWS_874,
        "dos855" | "dos866" => encoding_rs::IBM866,
        "koi8-r" => encoding_rs::KOI8_R,
        "koi8-u" => encoding_rs::KOI8_U,
        "ansi_936" | "gb2312" => encoding_rs::GBK,
        "ansi_932" => encoding_rs::SHIFT_JIS,
        "ansi_1252" => encoding_rs::WINDOWS_1252,
        "utf-8" | "utf8" => UTF_8,
        // 未知或缺省的代码页按 cp1251 处理
        _ => encoding_rs::WINDOWS_1251,
    }
}
