use html_escape::decode_html_entities;
use tdoc::html::gockl::{self, EmptyElementToken, EndElementToken, StartElementToken, Tokenizer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Open { name: String, self_closing: bool },
    Close { name: String },
    Text(String),
}

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Flattens the gockl token stream into tags and decoded text. Markup that
/// does not form a tag stays text; comments, directives and the bodies of
/// `<script>`/`<style>` are dropped.
pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut raw_text: Option<String> = None;

    while let Ok(token) = tokenizer.next_token() {
        let token = match token {
            gockl::Token::Text(raw) if raw.starts_with('<') => reparse_tail(raw),
            other => other,
        };

        if let Some(open) = &raw_text {
            let closes = matches!(
                &token,
                gockl::Token::EndElement(end) if end.name().eq_ignore_ascii_case(open)
            );
            if !closes {
                continue;
            }
            raw_text = None;
        }

        match classify(token) {
            Some(Token::Text(raw)) => text.push_str(&raw),
            Some(tag) => {
                flush_text(&mut text, &mut tokens);
                if let Token::Open {
                    name,
                    self_closing: false,
                } = &tag
                {
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                        raw_text = Some(name.clone());
                    }
                }
                tokens.push(tag);
            }
            None => {}
        }
    }
    flush_text(&mut text, &mut tokens);
    tokens
}

/// gockl returns markup within the last three bytes of the input as text.
fn reparse_tail(raw: String) -> gockl::Token {
    if raw.starts_with("</") {
        gockl::Token::EndElement(EndElementToken::new(raw))
    } else if raw.ends_with("/>") {
        gockl::Token::EmptyElement(EmptyElementToken::new(raw))
    } else {
        gockl::Token::StartElement(StartElementToken::new(raw))
    }
}

fn classify(token: gockl::Token) -> Option<Token> {
    match token {
        gockl::Token::Text(raw) => Some(Token::Text(raw)),
        gockl::Token::StartElement(start) => Some(tag(start.raw(), start.name(), |name| {
            Token::Open {
                name,
                self_closing: false,
            }
        })),
        gockl::Token::EmptyElement(empty) => Some(tag(empty.raw(), empty.name(), |name| {
            Token::Open {
                name,
                self_closing: true,
            }
        })),
        gockl::Token::EndElement(end) => {
            Some(tag(end.raw(), end.name(), |name| Token::Close { name }))
        }
        gockl::Token::CData(_)
        | gockl::Token::Comment(_)
        | gockl::Token::Directive(_)
        | gockl::Token::ProcInst(_) => None,
    }
}

fn tag(raw: &str, name: &str, make: impl FnOnce(String) -> Token) -> Token {
    let well_formed =
        raw.ends_with('>') && name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic());
    if well_formed {
        make(name.to_ascii_lowercase())
    } else {
        Token::Text(raw.to_string())
    }
}

fn flush_text(text: &mut String, tokens: &mut Vec<Token>) {
    if !text.is_empty() {
        tokens.push(Token::Text(decode_html_entities(text.as_str()).into_owned()));
        text.clear();
    }
}
