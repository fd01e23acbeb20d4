//! Token-level projection reader
//!
//! Used when the parser rejects a model (dialect features it does not know,
//! template tags that leave a dangling clause). Only the select list is read:
//! the first SELECT at parenthesis depth zero up to the next top-level clause.

use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use semview_core::ModelColumn;
use crate::extractor::ExtractError;
use crate::template::MaskedSql;

/// Keywords that end a select list at depth zero
const CLAUSE_KEYWORDS: &[Keyword] = &[
    Keyword::FROM,
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::QUALIFY,
    Keyword::ORDER,
    Keyword::LIMIT,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
    Keyword::WINDOW,
    Keyword::INTO,
];

/// Words that end an expression but are never an alias
const NOT_ALIASES: &[Keyword] = &[
    Keyword::END,
    Keyword::NULL,
    Keyword::TRUE,
    Keyword::FALSE,
    Keyword::ASC,
    Keyword::DESC,
];

/// Read output columns from the token stream of masked SQL
pub fn columns_from_tokens(dialect: &dyn Dialect, masked: &MaskedSql) -> Result<Vec<ModelColumn>, ExtractError> {
    let tokens = Tokenizer::new(dialect, &masked.sql)
        .tokenize()
        .map_err(|e| ExtractError::Unparseable { message: e.to_string() })?;

    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect();

    let list = select_list(&tokens).ok_or(ExtractError::NoProjection)?;
    let list = skip_set_quantifier(list);

    let mut items = split_top_level(list, &Token::Comma);

    // Snowflake accepts one trailing comma in a select list
    if items.len() > 1 && items.last().is_some_and(|item| item.is_empty()) {
        items.pop();
    }

    if items.iter().all(|item| item.is_empty()) {
        return Err(ExtractError::EmptyProjection);
    }
    if let Some(i) = items.iter().position(|item| item.is_empty()) {
        return Err(ExtractError::Unparseable {
            message: format!("empty select-list entry at position {}", i + 1),
        });
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let position = i + 1;
            if matches!(item, [Token::Mul] | [.., Token::Period, Token::Mul]) {
                return Err(ExtractError::Wildcard { position });
            }

            let expression = masked.restore(&render(expression_tokens(item)));
            match item_name(item) {
                Some(name) if !MaskedSql::is_placeholder(&name) => {
                    Ok(ModelColumn::new(name).with_expression(expression))
                }
                _ => Err(ExtractError::UnnamedColumn { position, expression }),
            }
        })
        .collect()
}

fn keyword(token: &Token) -> Option<Keyword> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.keyword),
        _ => None,
    }
}

fn word_value(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) => Some(word.value.clone()),
        _ => None,
    }
}

/// Tokens between the first depth-zero SELECT and the clause that ends it
fn select_list(tokens: &[Token]) -> Option<&[Token]> {
    let mut depth = 0i32;
    let mut start = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::SemiColon if depth == 0 && start.is_some() => {
                return start.map(|s| &tokens[s..i]);
            }
            _ if depth == 0 => match (start, keyword(token)) {
                (None, Some(Keyword::SELECT)) => start = Some(i + 1),
                (Some(s), Some(k)) if CLAUSE_KEYWORDS.contains(&k) => return Some(&tokens[s..i]),
                _ => {}
            },
            _ => {}
        }
    }

    start.map(|s| &tokens[s..])
}

fn skip_set_quantifier(list: &[Token]) -> &[Token] {
    match list.first().and_then(keyword) {
        Some(Keyword::DISTINCT) | Some(Keyword::ALL) => &list[1..],
        _ => list,
    }
}

/// Split on a separator that sits outside any parentheses
fn split_top_level<'a>(tokens: &'a [Token], separator: &Token) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            t if depth == 0 && t == separator => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Index of the last depth-zero occurrence of a keyword
fn last_top_level(tokens: &[Token], target: Keyword) -> Option<usize> {
    let mut depth = 0i32;
    let mut found = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            t if depth == 0 && keyword(t) == Some(target) => found = Some(i),
            _ => {}
        }
    }
    found
}

fn item_name(item: &[Token]) -> Option<String> {
    if let Some(alias) = explicit_alias(item) {
        return Some(alias);
    }
    if has_implicit_alias(item) {
        return item.last().and_then(word_value);
    }
    simple_reference(strip_casts(item))
}

fn explicit_alias(item: &[Token]) -> Option<String> {
    let as_index = last_top_level(item, Keyword::AS)?;
    match &item[as_index + 1..] {
        [alias] => word_value(alias),
        _ => None,
    }
}

/// `expr alias` without AS
fn has_implicit_alias(item: &[Token]) -> bool {
    let [.., previous, Token::Word(last)] = item else {
        return false;
    };

    if last.quote_style.is_none() && NOT_ALIASES.contains(&last.keyword) {
        return false;
    }

    matches!(
        previous,
        Token::Word(_) | Token::RParen | Token::Number(..) | Token::SingleQuotedString(_)
    )
}

/// Tokens of the expression part, without any alias
fn expression_tokens(item: &[Token]) -> &[Token] {
    if let Some(as_index) = last_top_level(item, Keyword::AS) {
        if as_index + 2 == item.len() {
            return &item[..as_index];
        }
    }
    if has_implicit_alias(item) {
        return &item[..item.len() - 1];
    }
    item
}

/// See through `CAST(x AS t)`, `TRY_CAST(x AS t)`, `x::t` and parentheses
fn strip_casts(item: &[Token]) -> &[Token] {
    if let [first, Token::LParen, inner @ .., Token::RParen] = item {
        if matches!(keyword(first), Some(Keyword::CAST) | Some(Keyword::TRY_CAST)) {
            if let Some(as_index) = last_top_level(inner, Keyword::AS) {
                return strip_casts(&inner[..as_index]);
            }
        }
    }

    let parts = split_top_level(item, &Token::DoubleColon);
    if parts.len() > 1 {
        return strip_casts(parts[0]);
    }

    if let [Token::LParen, inner @ .., Token::RParen] = item {
        return strip_casts(inner);
    }

    item
}

/// `name` or `qualifier.name`: the final name
fn simple_reference(tokens: &[Token]) -> Option<String> {
    if tokens.len() % 2 == 0 {
        return None;
    }

    for (i, token) in tokens.iter().enumerate() {
        let expected = if i % 2 == 0 {
            matches!(token, Token::Word(_))
        } else {
            matches!(token, Token::Period)
        };
        if !expected {
            return None;
        }
    }

    tokens.last().and_then(word_value)
}

/// Re-join tokens into readable SQL
fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Token> = None;

    for token in tokens {
        let tight = matches!(previous, None | Some(Token::Period | Token::DoubleColon | Token::LParen))
            || matches!(token, Token::Period | Token::DoubleColon | Token::RParen | Token::Comma)
            || (matches!(token, Token::LParen) && matches!(previous, Some(Token::Word(_))));
        if !tight {
            out.push(' ');
        }
        out.push_str(&token.to_string());
        previous = Some(token);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateMasker;
    use sqlparser::dialect::SnowflakeDialect;

    fn columns(sql: &str) -> Result<Vec<ModelColumn>, ExtractError> {
        columns_from_tokens(&SnowflakeDialect {}, &TemplateMasker::mask(sql))
    }

    fn names(sql: &str) -> Vec<String> {
        columns(sql).unwrap().into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn names_from_aliases_and_references() {
        let sql = "select distinct c.customer_id, upper(c.name) as name_upper, \
                   count(*) order_count, c.status from customers c where";
        assert_eq!(names(sql), vec!["customer_id", "name_upper", "order_count", "status"]);
    }

    #[test]
    fn casts_keep_the_inner_name() {
        let sql = "select cast(amount as number(10, 2)), try_cast(o.qty as int), \
                   created_at::date, (region)::varchar from orders qualify";
        assert_eq!(names(sql), vec!["amount", "qty", "created_at", "region"]);
    }

    #[test]
    fn skips_nested_selects() {
        let sql = "with base as (select a, b from t) select (select max(x) from u) as max_x, base.a from base";
        assert_eq!(names(sql), vec!["max_x", "a"]);
    }

    #[test]
    fn case_expression_needs_an_alias() {
        let sql = "select id, case when x > 0 then 'pos' else 'neg' end from t";
        assert!(matches!(columns(sql), Err(ExtractError::UnnamedColumn { position: 2, .. })));

        let sql = "select id, case when x > 0 then 'pos' else 'neg' end as sign from t";
        assert_eq!(names(sql), vec!["id", "sign"]);
    }

    #[test]
    fn expression_text_is_kept() {
        let cols = columns("select upper(c.name) as name_upper, {{ cents_to_dollars('amount') }} as amount from t").unwrap();
        assert_eq!(cols[0].expression, "upper(c.name)");
        assert_eq!(cols[1].expression, "{{ cents_to_dollars('amount') }}");
    }

    #[test]
    fn empty_entries_are_rejected() {
        assert!(matches!(columns("select a,, b from t"), Err(ExtractError::Unparseable { .. })));
        assert!(matches!(columns("select , a from t"), Err(ExtractError::Unparseable { .. })));
        assert_eq!(names("select a, b, from t"), vec!["a", "b"]);
    }

    #[test]
    fn missing_select_and_wildcards() {
        assert!(matches!(columns("update t set a = 1"), Err(ExtractError::NoProjection)));
        assert!(matches!(columns("select from t"), Err(ExtractError::EmptyProjection)));
        assert!(matches!(columns("select a, t.* from t"), Err(ExtractError::Wildcard { position: 2 })));
    }
}
