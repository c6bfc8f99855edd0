use std::convert::TryFrom;

use crate::DxfError;

/// 组码与取值。
pub(crate) type Pair = (i32, String);

/// 逐对读取 ASCII DXF 的组码/值行。
pub(crate) struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line_number: 0,
        }
    }

    pub(crate) fn next_pair(&mut self) -> Result<Option<Pair>, DxfError> {
        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件尾部的空行不构成组码
                    if line.trim().is_empty() && self.at_trailing_blank() {
                        continue;
                    }
                    break line;
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    /// 一次读出全部组码对。
    pub(crate) fn read_all(mut self) -> Result<Vec<Pair>, DxfError> {
        let mut pairs = Vec::new();
        while let Some(pair) = self.next_pair()? {
            pairs.push(pair);
        }
        Ok(pairs)
    }

    fn at_trailing_blank(&self) -> bool {
        self.lines.clone().all(|line| line.trim().is_empty())
    }
}

pub(crate) fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

pub(crate) fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

pub(crate) fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pairs_and_strips_carriage_returns() {
        let source = "  0\r\nSECTION\r\n  2\r\nENTITIES\r\n";
        let pairs = DxfReader::new(source).read_all().unwrap();
        assert_eq!(
            pairs,
            vec![(0, "SECTION".to_string()), (2, "ENTITIES".to_string())]
        );
    }

    #[test]
    fn trailing_blank_lines_are_ignored() {
        let pairs = DxfReader::new("0\nEOF\n\n\n").read_all().unwrap();
        assert_eq!(pairs, vec![(0, "EOF".to_string())]);
    }

    #[test]
    fn missing_value_line_is_reported() {
        let err = DxfReader::new("0\nSECTION\n2").read_all().unwrap_err();
        assert!(matches!(err, DxfError::Invalid { .. }));
    }

    #[test]
    fn non_numeric_group_code_is_rejected() {
        let err = DxfReader::new("abc\nSECTION\n").read_all().unwrap_err();
        assert!(matches!(err, DxfError::Invalid { .. }));
    }
}
