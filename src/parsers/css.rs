//! CSS 解析器模块
//!
//! 目标编辑器只渲染少量内联样式。本模块使用 cssparser 对 `style` 属性做词法切分，
//! 按声明逐条检查属性名，只保留允许列表中的声明。
//!
//! # 使用示例
//!
//! ```rust
//! use guru_bundle::parsers::css::filter_style_declarations;
//!
//! let style = "color: red; margin: 0 auto; font-weight: bold";
//! let allowed = &["color", "font-weight"];
//! assert_eq!(
//!     filter_style_declarations(style, allowed),
//!     "color: red; font-weight: bold"
//! );
//! ```

use cssparser::{Parser, ParserInput, Token};

/// 一条内联样式声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDeclaration {
    /// 小写的属性名
    pub property: String,
    /// 原样保留的属性值（已去除首尾空白）
    pub value: String,
}

/// 将 `style` 属性值切分为声明列表
///
/// 以顶层分号为界；函数与括号块内部的分号不会切断声明，
/// 因为 cssparser 在返回块 token 后会整体跳过其内容。
/// 没有属性名或冒号的片段会被丢弃。
pub fn parse_style_declarations(style: &str) -> Vec<StyleDeclaration> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();

    loop {
        if parser.is_exhausted() {
            break;
        }

        let start = parser.position();
        let mut property: Option<String> = None;
        let mut value_start = None;
        let mut finished = false;

        loop {
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => {
                    finished = true;
                    break;
                }
            };

            match token {
                Token::Semicolon => break,
                Token::Ident(ref name) if property.is_none() && value_start.is_none() => {
                    property = Some(name.to_ascii_lowercase());
                }
                Token::Colon if value_start.is_none() => {
                    value_start = Some(parser.position());
                }
                _ => {}
            }
        }

        let raw = parser.slice_from(start);
        if let (Some(property), Some(value_start)) = (property, value_start) {
            let value = parser.slice_from(value_start);
            let value = value.strip_suffix(';').unwrap_or(value).trim();
            if !value.is_empty() {
                declarations.push(StyleDeclaration {
                    property,
                    value: value.to_string(),
                });
            }
        }

        if finished || raw.is_empty() {
            break;
        }
    }

    declarations
}

/// 过滤内联样式，仅保留允许的属性
///
/// 输出格式固定为 `prop: value; prop: value`，对已经过滤过的输入再次调用结果不变。
pub fn filter_style_declarations(style: &str, allowed: &[&str]) -> String {
    parse_style_declarations(style)
        .into_iter()
        .filter(|declaration| allowed.contains(&declaration.property.as_str()))
        .map(|declaration| format!("{}: {}", declaration.property, declaration.value))
        .collect::<Vec<String>>()
        .join("; ")
}
