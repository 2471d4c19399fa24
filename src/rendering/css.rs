//! Stylesheet parsing on top of `cssparser`.
//!
//! Only what the cascade needs: style rules with their declarations.
//! Conditional group rules (`@media`, `@supports`, `@layer`, `@container`)
//! are flattened into their contents; every other at-rule is skipped.
//! Malformed input never fails, it just yields fewer rules.

use cssparser::{
    parse_important, AtRuleParser, AtRuleType, CowRcStr, DeclarationListParser,
    DeclarationParser, ParseError, Parser, ParserInput, QualifiedRuleParser, RuleListParser,
    SourceLocation, Token,
};
use log::trace;

/// Name under which an `@apply` utility list is kept in a declaration block
pub const APPLY: &str = "@apply";

/// One `name: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// A selector list and its declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Complex selectors of the list, as source text
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

const FLATTENED_AT_RULES: &[&str] = &["media", "supports", "layer", "container", "document"];

type Failure<'i> = ParseError<'i, ()>;

/// Step over one component value, a whole block or function included.
/// `false` at the end of the input.
fn skip_component(input: &mut Parser<'_, '_>) -> bool {
    let is_block = match input.next_including_whitespace_and_comments() {
        Ok(token) => matches!(
            token,
            Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock
        ),
        Err(_) => return false,
    };
    if is_block {
        let _ = input.parse_nested_block(|block| {
            while block.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, Failure<'_>>(())
        });
    }
    true
}

/// The rest of `input` as source text.
fn rest_of<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while skip_component(input) {}
    input.slice_from(start)
}

struct DeclarationsParser;

impl<'i> DeclarationParser<'i> for DeclarationsParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Declaration, Failure<'i>> {
        // custom property names are case-sensitive
        let name = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };
        let start = input.position();
        let mut end = start;
        let mut important = false;
        loop {
            let state = input.state();
            if input.try_parse(parse_important).is_ok() {
                if input.is_exhausted() {
                    important = true;
                    break;
                }
                input.reset(&state);
            }
            if !skip_component(input) {
                break;
            }
            end = input.position();
        }
        let value = input.slice(start..end).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(Declaration {
            name,
            value: value.to_string(),
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationsParser {
    type PreludeNoBlock = Declaration;
    type PreludeBlock = ();
    type AtRule = Declaration;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtRuleType<Declaration, ()>, Failure<'i>> {
        if !name.eq_ignore_ascii_case("apply") {
            return Err(input.new_custom_error(()));
        }
        // utility names carry `:`, `/` and brackets; keep them as written
        let mut important = false;
        let classes: Vec<&str> = rest_of(input)
            .split_whitespace()
            .filter(|c| {
                let flag = c.eq_ignore_ascii_case("!important");
                important |= flag;
                !flag
            })
            .collect();
        Ok(AtRuleType::WithoutBlock(Declaration {
            name: APPLY.to_string(),
            value: classes.join(" "),
            important,
        }))
    }

    fn rule_without_block(&mut self, prelude: Declaration, _location: SourceLocation) -> Declaration {
        prelude
    }
}

fn parse_declaration_list(input: &mut Parser<'_, '_>) -> Vec<Declaration> {
    DeclarationListParser::new(input, DeclarationsParser)
        .filter_map(|result| match result {
            Ok(decl) => Some(decl),
            Err((_, source)) => {
                trace!("skipping declaration {:?}", source.trim());
                None
            }
        })
        .collect()
}

struct RulesParser;

impl<'i> QualifiedRuleParser<'i> for RulesParser {
    type Prelude = Vec<String>;
    type QualifiedRule = Vec<StyleRule>;
    type Error = ();

    fn parse_prelude<'t>(&mut self, input: &mut Parser<'i, 't>) -> Result<Vec<String>, Failure<'i>> {
        input.parse_comma_separated(|part| Ok(rest_of(part).trim().to_string()))
    }

    fn parse_block<'t>(
        &mut self,
        selectors: Vec<String>,
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<Vec<StyleRule>, Failure<'i>> {
        Ok(vec![StyleRule {
            selectors,
            declarations: parse_declaration_list(input),
        }])
    }
}

impl<'i> AtRuleParser<'i> for RulesParser {
    type PreludeNoBlock = ();
    type PreludeBlock = ();
    type AtRule = Vec<StyleRule>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtRuleType<(), ()>, Failure<'i>> {
        let name = name.to_ascii_lowercase();
        if FLATTENED_AT_RULES.contains(&name.as_str()) {
            Ok(AtRuleType::WithBlock(()))
        } else {
            Err(input.new_custom_error(()))
        }
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: (),
        _location: SourceLocation,
        input: &mut Parser<'i, 't>,
    ) -> Result<Vec<StyleRule>, Failure<'i>> {
        Ok(parse_rule_list(input, false))
    }
}

fn parse_rule_list(input: &mut Parser<'_, '_>, top_level: bool) -> Vec<StyleRule> {
    let rules = if top_level {
        RuleListParser::new_for_stylesheet(input, RulesParser)
    } else {
        RuleListParser::new_for_nested_rule(input, RulesParser)
    };
    rules
        .filter_map(|result| match result {
            Ok(rules) => Some(rules),
            Err((_, source)) => {
                trace!("skipping rule {:?}", source.trim());
                None
            }
        })
        .flatten()
        .collect()
}

/// Parse a stylesheet into its style rules, in source order.
pub fn parse_stylesheet(css: &str) -> Vec<StyleRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    parse_rule_list(&mut parser, true)
}

/// Parse the body of a declaration block (or a `style` attribute).
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(block);
    let mut parser = Parser::new(&mut input);
    parse_declaration_list(&mut parser)
}

/// Top-level component values of a property value, as source text.
/// Functions stay whole: `rgba(0, 0, 0, .2) 0 1px` is three values.
pub fn component_values(value: &str) -> Vec<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut out = Vec::new();
    loop {
        parser.skip_whitespace();
        let start = parser.position();
        if !skip_component(&mut parser) {
            break;
        }
        let text = parser.slice_from(start).trim();
        if !text.is_empty() && !text.starts_with("/*") {
            out.push(text.to_string());
        }
    }
    out
}

/// Comma-separated layers of a property value, as source text.
pub fn comma_layers(value: &str) -> Vec<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_comma_separated(|layer| Ok::<_, Failure<'_>>(rest_of(layer).trim().to_string()))
        .unwrap_or_else(|_| vec![value.trim().to_string()])
}

enum Component {
    Var,
    Block(char),
    Plain,
}

/// Rewrite every `var(--name, fallback)` in `value` through `resolve`,
/// references nested in other functions included. `None` as soon as one
/// reference cannot be resolved.
pub fn substitute_vars<F>(value: &str, mut resolve: F) -> Option<String>
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut out = String::with_capacity(value.len());
    substitute_into(&mut parser, &mut resolve, &mut out)?;
    Some(out)
}

fn substitute_into<F>(input: &mut Parser<'_, '_>, resolve: &mut F, out: &mut String) -> Option<()>
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    loop {
        let start = input.position();
        let component = match input.next_including_whitespace_and_comments() {
            Err(_) => return Some(()),
            Ok(Token::Function(name)) if name.eq_ignore_ascii_case("var") => Component::Var,
            Ok(Token::Function(_)) | Ok(Token::ParenthesisBlock) => Component::Block(')'),
            Ok(Token::SquareBracketBlock) => Component::Block(']'),
            Ok(Token::CurlyBracketBlock) => Component::Block('}'),
            Ok(_) => Component::Plain,
        };
        match component {
            Component::Plain => out.push_str(input.slice_from(start)),
            Component::Block(close) => {
                out.push_str(input.slice_from(start));
                input
                    .parse_nested_block(|block| {
                        substitute_into(block, resolve, out)
                            .ok_or_else(|| block.new_custom_error::<(), ()>(()))
                    })
                    .ok()?;
                out.push(close);
            }
            Component::Var => {
                let (name, fallback) = input
                    .parse_nested_block(|block| {
                        block.skip_whitespace();
                        let name = block.expect_ident_cloned()?.to_string();
                        block.skip_whitespace();
                        let fallback = if block.try_parse(|b| b.expect_comma()).is_ok() {
                            Some(rest_of(block).trim().to_string())
                        } else {
                            rest_of(block);
                            None
                        };
                        Ok::<_, Failure<'_>>((name, fallback))
                    })
                    .ok()?;
                out.push_str(&resolve(&name, fallback.as_deref())?);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_and_important() {
        let rules = parse_stylesheet(
            "/* c */ .btn, button { color: red; background: blue !important }\np{margin:0}",
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selectors, vec![".btn", "button"]);
        assert_eq!(rules[0].declarations.len(), 2);
        assert!(rules[0].declarations[1].important);
        assert_eq!(rules[0].declarations[1].value, "blue");
        assert_eq!(rules[1].selectors, vec!["p"]);
    }

    #[test]
    fn flattens_media_and_skips_keyframes() {
        let css = "@import url(x.css); @keyframes spin { from { top: 0 } to { top: 1px } } \
                   @media (min-width: 10px) { .a { color: red } } @font-face { font-family: x } .b { color: blue }";
        let rules = parse_stylesheet(css);
        let sels: Vec<_> = rules.iter().map(|r| r.selectors.join(",")).collect();
        assert_eq!(sels, vec![".a", ".b"]);
    }

    #[test]
    fn semicolons_inside_urls_and_strings() {
        let decls = parse_declarations(
            "background-image: url(data:image/png;base64,AAA); content: 'a;b'; --Brand: #fff",
        );
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].value, "url(data:image/png;base64,AAA)");
        assert_eq!(decls[1].value, "'a;b'");
        assert_eq!(decls[2].name, "--Brand");
    }

    #[test]
    fn important_after_a_function() {
        let decls = parse_declarations("box-shadow: 0 0 4px rgba(0,0,0,.3) !important; color: red");
        assert_eq!(decls[0].value, "0 0 4px rgba(0,0,0,.3)");
        assert!(decls[0].important);
        assert!(!decls[1].important);
    }

    #[test]
    fn apply_is_kept_as_a_declaration() {
        let rules = parse_stylesheet(
            "@layer utilities { .bg-grey-500 { @apply bg-gray-500 hover:bg-gray-600 !important; } }",
        );
        assert_eq!(rules.len(), 1);
        let decl = &rules[0].declarations[0];
        assert_eq!(decl.name, APPLY);
        assert_eq!(decl.value, "bg-gray-500 hover:bg-gray-600");
        assert!(decl.important);
    }

    #[test]
    fn unterminated_input_does_not_panic() {
        let rules = parse_stylesheet(".a { color: red; .b { ");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations[0].value, "red");
        assert!(parse_stylesheet("}}}{{{").len() <= 1);
        assert!(parse_stylesheet("/* open").is_empty());
    }

    #[test]
    fn values_split_outside_functions() {
        assert_eq!(
            component_values("rgba(0,0,0,.2) 0  1px"),
            vec!["rgba(0,0,0,.2)", "0", "1px"]
        );
        assert_eq!(
            comma_layers("rgba(0,0,0,.2) 0 1px, red"),
            vec!["rgba(0,0,0,.2) 0 1px", "red"]
        );
    }

    #[test]
    fn var_references_are_substituted_in_nested_functions() {
        let out = substitute_vars("0 0 4px rgba(var(--c), .5) var(--missing, 2px)", |name, fallback| {
            match name {
                "--c" => Some("1, 2, 3".to_string()),
                _ => fallback.map(str::to_string),
            }
        });
        assert_eq!(out.as_deref(), Some("0 0 4px rgba(1, 2, 3, .5) 2px"));
        assert_eq!(substitute_vars("var(--nope)", |_, f| f.map(str::to_string)), None);
    }
}
