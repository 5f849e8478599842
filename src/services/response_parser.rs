//! 响应解析 - 业务能力层
//!
//! 按顺序尝试一组解析策略，第一个成功的结果即为解析结果：
//! 1. 严格 JSON
//! 2. 宽松字面量（单引号字符串、`True`/`False`/`None`、元组、尾随逗号）

use crate::error::ParseError;
use serde_json::{Map, Number, Value};

/// 解析策略
pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, body: &str) -> Result<Value, ParseError>;
}

/// 严格 JSON 解析
pub struct JsonStrategy;

impl ParseStrategy for JsonStrategy {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, body: &str) -> Result<Value, ParseError> {
        serde_json::from_str(body).map_err(|e| ParseError::strategy(self.name(), e.to_string()))
    }
}

/// 宽松字面量解析
pub struct LiteralStrategy;

impl ParseStrategy for LiteralStrategy {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn parse(&self, body: &str) -> Result<Value, ParseError> {
        let mut parser = LiteralParser::new(body);
        parser
            .parse_document()
            .map_err(|message| ParseError::strategy(self.name(), message))
    }
}

/// 响应解析器
pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl ResponseParser {
    pub fn new(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    /// 依次尝试所有策略
    ///
    /// 全部失败时返回 `ParseError::Exhausted`，其中按顺序包含每个策略的失败原因。
    pub fn parse(&self, body: &str) -> Result<Value, ParseError> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.parse(body) {
                Ok(value) => return Ok(value),
                Err(e) => failures.push(e),
            }
        }

        Err(ParseError::Exhausted(failures))
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(vec![Box::new(JsonStrategy), Box::new(LiteralStrategy)])
    }
}

/// 与 serde_json 的递归上限一致
const MAX_DEPTH: usize = 128;

struct LiteralParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    depth: usize,
}

type ParseResult<T> = Result<T, String>;

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
            depth: 0,
        }
    }

    fn parse_document(&mut self) -> ParseResult<Value> {
        let value = self.parse_value()?;
        self.skip_ws();
        match self.chars.peek() {
            None => Ok(value),
            Some(&(pos, c)) => Err(format!("位置 {} 处有多余字符 '{}'", pos, c)),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        self.skip_ws();
        let &(pos, c) = self.chars.peek().ok_or("意外的输入结束")?;
        match c {
            '{' => self.nested(|p| p.parse_dict()),
            '[' => self.nested(|p| p.parse_sequence('[')),
            '(' => self.nested(|p| p.parse_sequence('(')),
            '\'' | '"' => self.parse_string().map(Value::String),
            '-' | '+' | '0'..='9' | '.' => self.parse_number(),
            c if c.is_alphabetic() => self.parse_keyword(),
            other => Err(format!("位置 {} 处无法识别的字符 '{}'", pos, other)),
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<Value>) -> ParseResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("嵌套过深 (超过 {} 层)", MAX_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((pos, c)) => Err(format!("位置 {} 处期望 '{}'，实际为 '{}'", pos, expected, c)),
            None => Err(format!("期望 '{}'，但输入已结束", expected)),
        }
    }

    /// 读到 `close` 时返回 true，读到逗号返回 false
    fn separator(&mut self, close: char) -> ParseResult<bool> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, ',')) => {
                self.skip_ws();
                if matches!(self.chars.peek(), Some(&(_, c)) if c == close) {
                    self.chars.next();
                    return Ok(true);
                }
                Ok(false)
            }
            Some((_, c)) if c == close => Ok(true),
            Some((pos, c)) => Err(format!("位置 {} 处期望 ',' 或 '{}'，实际为 '{}'", pos, close, c)),
            None => Err(format!("期望 '{}'，但输入已结束", close)),
        }
    }

    fn parse_dict(&mut self) -> ParseResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();

        self.skip_ws();
        if matches!(self.chars.peek(), Some(&(_, '}'))) {
            self.chars.next();
            return Ok(Value::Object(map));
        }

        loop {
            let key = match self.parse_value()? {
                Value::String(s) => s,
                Value::Null => "None".to_string(),
                other => other.to_string(),
            };
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            if self.separator('}')? {
                return Ok(Value::Object(map));
            }
        }
    }

    fn parse_sequence(&mut self, open: char) -> ParseResult<Value> {
        let close = if open == '[' { ']' } else { ')' };
        self.expect(open)?;
        let mut items = Vec::new();

        self.skip_ws();
        if matches!(self.chars.peek(), Some(&(_, c)) if c == close) {
            self.chars.next();
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);
            if self.separator(close)? {
                return Ok(Value::Array(items));
            }
        }
    }

    fn parse_string(&mut self) -> ParseResult<String> {
        let (start, quote) = self.chars.next().ok_or("意外的输入结束")?;
        let mut out = String::new();

        loop {
            let (_, c) = self
                .chars
                .next()
                .ok_or_else(|| format!("位置 {} 开始的字符串未闭合", start))?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let (pos, esc) = self.chars.next().ok_or("转义序列不完整")?;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '\'' | '"' => out.push(esc),
                        'x' => out.push(self.parse_hex_escape(2, pos)?),
                        'u' => out.push(self.parse_hex_escape(4, pos)?),
                        'U' => out.push(self.parse_hex_escape(8, pos)?),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                other => out.push(other),
            }
        }
    }

    fn parse_hex_escape(&mut self, digits: usize, pos: usize) -> ParseResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, c) = self.chars.next().ok_or("转义序列不完整")?;
            let digit = c
                .to_digit(16)
                .ok_or_else(|| format!("位置 {} 处转义序列非法", pos))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| format!("位置 {} 处码点非法", pos))
    }

    fn parse_number(&mut self) -> ParseResult<Value> {
        let &(start, _) = self.chars.peek().ok_or("意外的输入结束")?;
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        let text: String = self.src[start..end].chars().filter(|c| *c != '_').collect();
        let text = text.strip_prefix('+').unwrap_or(&text);

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("位置 {} 处数字非法: {}", start, text))
    }

    fn parse_keyword(&mut self) -> ParseResult<Value> {
        let &(start, _) = self.chars.peek().ok_or("意外的输入结束")?;
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        match &self.src[start..end] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(format!("位置 {} 处未知标识符 '{}'", start, other)),
        }
    }
}
