use parse_automata::{
    combinator::{Error, Grammar, MemoKind, Order, Parser},
    util::{
        primitives::MatcherID,
        stream::{Stream, Text},
    },
};
use quickcheck::{quickcheck, Arbitrary, Gen};

/// A random tree shaped grammar. Every repeated body consumes input.
#[derive(Clone, Debug)]
enum Shape {
    Lit(String),
    Plus(String),
    Seq(Box<Shape>, Box<Shape>),
    Alt(Box<Shape>, Box<Shape>),
    Opt(Box<Shape>),
}

impl Arbitrary for Shape {
    fn arbitrary(g: &mut Gen) -> Shape {
        shape(g, 3)
    }
}

fn shape(g: &mut Gen, depth: usize) -> Shape {
    let choices = if depth == 0 { 2 } else { 5 };
    let pick = u8::arbitrary(g) % choices;
    match pick {
        0 => Shape::Lit(literal(g)),
        1 => Shape::Plus(literal(g)),
        2 => Shape::Seq(
            Box::new(shape(g, depth - 1)),
            Box::new(shape(g, depth - 1)),
        ),
        3 => Shape::Alt(
            Box::new(shape(g, depth - 1)),
            Box::new(shape(g, depth - 1)),
        ),
        _ => Shape::Opt(Box::new(shape(g, depth - 1))),
    }
}

fn literal(g: &mut Gen) -> String {
    g.choose(&["a", "b", "ab"]).copied().unwrap_or("a").to_string()
}

fn input(bits: &[bool]) -> String {
    bits.iter().take(8).map(|&b| if b { 'a' } else { 'b' }).collect()
}

fn build(
    g: &mut Grammar,
    shape: &Shape,
    memo: bool,
) -> Result<MatcherID, Error> {
    let id = match *shape {
        Shape::Lit(ref text) => g.literal(text)?,
        Shape::Plus(ref text) => {
            let lit = g.literal(text)?;
            g.repeat(lit, 1, None, Order::DepthFirst)?
        }
        Shape::Seq(ref a, ref b) => {
            let a = build(g, a, memo)?;
            let b = build(g, b, memo)?;
            g.sequence(&[a, b])?
        }
        Shape::Alt(ref a, ref b) => {
            let a = build(g, a, memo)?;
            let b = build(g, b, memo)?;
            g.alternation(&[a, b])?
        }
        Shape::Opt(ref a) => {
            let a = build(g, a, memo)?;
            g.repeat(a, 0, Some(1), Order::DepthFirst)?
        }
    };
    if memo {
        g.memoize(id, MemoKind::Right)
    } else {
        Ok(id)
    }
}

/// Every alternative as its text and the length of the stream left over.
fn results(
    shape: &Shape,
    text: &str,
    memo: bool,
) -> Option<Vec<(String, usize)>> {
    let mut g = Grammar::new();
    let root = build(&mut g, shape, memo).ok()?;
    let parser = Parser::new(&g, root).ok()?;
    let all = parser.parse_all(Text::new(text)).ok()?;
    Some(all.iter().map(|m| (m.text(), m.rest.len())).collect())
}

fn lookaheads(
    g: &mut Grammar,
    lit: &str,
) -> Result<(MatcherID, MatcherID), Error> {
    let id = g.literal(lit)?;
    Ok((g.lookahead(id)?, g.not(id)?))
}

quickcheck! {
    fn prop_right_memo_is_transparent(shape: Shape, bits: Vec<bool>) -> bool {
        let text = input(&bits);
        let plain = results(&shape, &text, false);
        plain.is_some() && plain == results(&shape, &text, true)
    }

    fn prop_lookahead_consumes_nothing(bits: Vec<bool>, lit: Vec<bool>) -> bool {
        let text = input(&bits);
        let mut lit = input(&lit);
        lit.truncate(3);
        if lit.is_empty() {
            lit.push('a');
        }

        let mut g = Grammar::new();
        let (peek, not) = match lookaheads(&mut g, &lit) {
            Ok(ids) => ids,
            Err(_) => return false,
        };
        let run = |root: MatcherID| {
            Parser::new(&g, root)
                .and_then(|p| p.parse_all(Text::new(&text)))
                .unwrap_or_default()
        };
        let seen = run(peek);
        let unseen = run(not);
        let len = text.chars().count();
        seen.len() + unseen.len() == 1
            && (seen.len() == 1) == text.starts_with(&lit)
            && seen.iter().chain(unseen.iter()).all(|m| {
                m.rest.len() == len && m.values.is_empty()
            })
    }
}
