use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use ocra::{FontStyle, Highlighter, RawGrammar, Style, Token};

/// Highlights a file with a grammar and prints it to the terminal.
/// Requires a terminal that supports truecolor.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON grammar
    #[arg(short, long, default_value = "grammars/sql.json")]
    grammar: PathBuf,

    /// File to highlight, stdin if missing
    file: Option<PathBuf>,

    /// Print the tokens of each line instead of the styled text
    #[arg(long)]
    tokens: bool,
}

/// `#rrggbb` foreground (or `-`) followed by `[biu]` flags when any are set
fn describe_style(style: Option<&Style>) -> String {
    let Some(style) = style else {
        return "-".to_string();
    };
    let mut out = style
        .foreground
        .map_or_else(|| "-".to_string(), |c| c.as_hex());
    if !style.font_style.is_empty() {
        out.push('[');
        for (flag, c) in [
            (FontStyle::BOLD, 'b'),
            (FontStyle::ITALIC, 'i'),
            (FontStyle::UNDERLINE, 'u'),
        ] {
            if style.font_style.contains(flag) {
                out.push(c);
            }
        }
        out.push(']');
    }
    out
}

fn render_line(highlighter: &Highlighter, line: &str, tokens: &[Token], out: &mut String) {
    let mut last = 0;
    for token in tokens {
        out.push_str(&line[last..token.span.start]);
        let prefix = highlighter
            .style_of(token.group)
            .map(|s| s.ansi_prefix())
            .unwrap_or_default();
        out.push_str(&prefix);
        out.push_str(&line[token.span.clone()]);
        if !prefix.is_empty() {
            // reset
            out.push_str("\x1b[0m");
        }
        last = token.span.end;
    }
    out.push_str(&line[last..]);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let raw = RawGrammar::load_from_file(&cli.grammar)?;
    let mut highlighter = Highlighter::new();
    highlighter.load_grammar(&raw)?;

    let content = match &cli.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let lines: Vec<&str> = content.lines().collect();
    let highlighted = highlighter.rehighlight(lines.iter().copied());

    let mut out = String::new();
    for (idx, (line, tokens)) in lines.iter().zip(&highlighted).enumerate() {
        if cli.tokens {
            for token in tokens {
                out.push_str(&format!(
                    "{}:{}..{} {} {} '{}'\n",
                    idx + 1,
                    token.span.start,
                    token.span.end,
                    highlighter.group_name(token.group).unwrap_or("?"),
                    describe_style(highlighter.style_of(token.group)),
                    &line[token.span.clone()]
                ));
            }
        } else {
            render_line(&highlighter, line, tokens, &mut out);
            out.push('\n');
        }
    }
    print!("{out}");

    Ok(())
}
