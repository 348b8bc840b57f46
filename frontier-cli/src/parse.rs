//! Parser for the edit command stream.
//!
//! One command per token group, any amount of whitespace between them:
//! `K dim sigma` resets the engine, `I j c` appends letter `c` to string
//! `j`, `D j` pops the front of string `j`, `X` ends the stream.

use nom::branch::alt;
use nom::character::complete::{char, digit1, multispace0, multispace1, satisfy};
use nom::combinator::{map, map_res, value};
use nom::sequence::{pair, preceded, separated_pair};
use nom::IResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Reset { dim: usize, sigma: usize },
    Append { string: usize, letter: u8 },
    Pop { string: usize },
    End,
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse)(input)
}

fn letter(input: &str) -> IResult<&str, u8> {
    map(satisfy(|c| c.is_ascii_uppercase()), |c| c as u8)(input)
}

fn reset(input: &str) -> IResult<&str, Command> {
    map(
        preceded(
            pair(char('K'), multispace1),
            separated_pair(number, multispace1, number),
        ),
        |(dim, sigma)| Command::Reset { dim, sigma },
    )(input)
}

fn append(input: &str) -> IResult<&str, Command> {
    map(
        preceded(
            pair(char('I'), multispace1),
            separated_pair(number, multispace1, letter),
        ),
        |(string, letter)| Command::Append { string, letter },
    )(input)
}

fn pop(input: &str) -> IResult<&str, Command> {
    map(
        preceded(pair(char('D'), multispace1), number),
        |string| Command::Pop { string },
    )(input)
}

fn end(input: &str) -> IResult<&str, Command> {
    value(Command::End, char('X'))(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    preceded(multispace0, alt((reset, append, pop, end)))(input)
}

/// Parse every command on one line. On garbage, returns the unreadable
/// remainder as the error.
pub fn parse_line(line: &str) -> Result<Vec<Command>, &str> {
    let mut out = Vec::new();
    let mut rest = line;
    while !rest.trim_start().is_empty() {
        match command(rest) {
            Ok((next, cmd)) => {
                out.push(cmd);
                rest = next;
            }
            Err(_) => return Err(rest.trim_start()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_commands() {
        assert_eq!(
            parse_line("K 4 3"),
            Ok(vec![Command::Reset { dim: 4, sigma: 3 }])
        );
        assert_eq!(
            parse_line("I 0 A"),
            Ok(vec![Command::Append {
                string: 0,
                letter: b'A'
            }])
        );
        assert_eq!(parse_line("D 2"), Ok(vec![Command::Pop { string: 2 }]));
        assert_eq!(parse_line("X"), Ok(vec![Command::End]));
        assert_eq!(parse_line("   "), Ok(vec![]));
    }

    #[test]
    fn many_commands_on_one_line() {
        let cmds = parse_line("K 2 2  I 0 A I 1 B D 0 X").unwrap();
        assert_eq!(cmds.len(), 5);
        assert_eq!(cmds[3], Command::Pop { string: 0 });
        assert_eq!(cmds[4], Command::End);
    }

    #[test]
    fn garbage_is_reported() {
        assert_eq!(parse_line("K 2 2 k 1"), Err("k 1"));
        assert_eq!(parse_line("I A 0"), Err("I A 0"));
        assert_eq!(parse_line("I 0 a"), Err("I 0 a"));
    }
}
