//! Lexer implementation.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Token<'input> {
    Arrow,
    VertBar,
    Newline,
    Symbol(&'input str),
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

lexgen::lexer! {
    pub Lexer -> Token<'input>;

    let whitespace = [' ' '\t'];
    let newline = '\r'* '\n' | '\r';
    let comment_char = _ # ['\n' '\r'];
    let symbol_char = _ # [' ' '\t' '\n' '\r' '|' '#'];

    rule Init {
        $whitespace+,
        // A comment runs to the end of the line or of the input.
        "#" $comment_char*,
        $newline = Token::Newline,
        "->" = Token::Arrow,
        "|" = Token::VertBar,
        $symbol_char+ => |lexer| {
            let token = Token::Symbol(lexer.match_());
            lexer.return_(token)
        },
    }
}
