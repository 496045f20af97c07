use parse_automata::re::{Config, Engine, Regex};
use quickcheck::quickcheck;

/// Patterns without capture groups, which every engine accepts.
const PLAIN: &[&str] = &[
    "ab|a",
    "a+b",
    "(?:ab|a)(?:bc|c)",
    "[ab]*c",
    "a{1,3}?b",
    r"\bab",
    "(?:a|b)*?c",
    "(?=ab)a",
    "(?<!b)a+",
    "(?<=a|bc)c",
    "(?:a?)*b",
    "c$|^a",
    "abc|ab",
];

/// Patterns that need the backtracker or the complex engine.
const GROUPED: &[&str] = &[
    "(a|ab)(c|bcd)(d*)",
    "(a+)(b+)?",
    r"(a|b)\1",
    r"(a|ab)(b?)\1",
    "(a)?(?(1)b|c)",
    "((a)|b)+",
    "(?<=(a))b",
    "(a*)+?c",
    r"(?=(a+))\1b",
];

fn plain_engines() -> Vec<Config> {
    vec![
        Config::new().engine(Engine::Backtrack),
        Config::new().engine(Engine::Backtrack).compress_stack(false),
        Config::new().engine(Engine::Backtrack).fuse_literals(false),
        Config::new().engine(Engine::Complex),
        Config::new().engine(Engine::Complex).fuse_literals(true),
        Config::new().engine(Engine::Simple),
    ]
}

fn grouped_engines() -> Vec<Config> {
    vec![
        Config::new().engine(Engine::Backtrack),
        Config::new().engine(Engine::Backtrack).lookaround_cache(false),
        Config::new().engine(Engine::Complex),
        Config::new().engine(Engine::Complex).fuse_literals(true),
    ]
}

fn haystack(bytes: &[u8]) -> String {
    let alphabet = ['a', 'b', 'c', 'd', ' '];
    bytes.iter().take(10).map(|&b| alphabet[usize::from(b) % 5]).collect()
}

type Outcome = (Vec<(usize, usize)>, Option<Vec<Option<(usize, usize)>>>);

/// Every match of `pattern` and the captures of the first one.
fn outcome(config: Config, pattern: &str, haystack: &str) -> Option<Outcome> {
    let re = Regex::builder().configure(config).build(pattern).ok()?;
    let spans = re.find_iter(haystack).map(|s| (s.start, s.end)).collect();
    let caps = re.captures(haystack).map(|caps| {
        caps.iter().map(|g| g.map(|s| (s.start, s.end))).collect()
    });
    Some((spans, caps))
}

fn agree(patterns: &[&str], configs: &[Config], haystack: &str) -> bool {
    patterns.iter().all(|pattern| {
        let first = outcome(configs[0], pattern, haystack);
        first.is_some()
            && configs[1..]
                .iter()
                .all(|&config| outcome(config, pattern, haystack) == first)
    })
}

quickcheck! {
    fn prop_plain_patterns_agree(bytes: Vec<u8>) -> bool {
        agree(PLAIN, &plain_engines(), &haystack(&bytes))
    }

    fn prop_grouped_patterns_agree(bytes: Vec<u8>) -> bool {
        agree(GROUPED, &grouped_engines(), &haystack(&bytes))
    }
}

#[test]
fn known_outcomes() {
    let cases: &[(&str, &str, Option<(usize, usize)>)] = &[
        ("(a|ab)(c|bcd)(d*)", "abcd", Some((0, 4))),
        (r"(a|ab)(b?)\1$", "abab", Some((0, 4))),
        ("(a*)+?c", "aac", Some((0, 3))),
        ("(?:a?)*b", " aab", Some((1, 4))),
        (r"(?=(a+))\1b", "aab", Some((0, 3))),
    ];
    for &(pattern, hay, want) in cases {
        for config in grouped_engines() {
            let re = Regex::builder().configure(config).build(pattern).unwrap();
            let got = re.find(hay).map(|s| (s.start, s.end));
            assert_eq!(got, want, "{:?} on {:?} with {:?}", pattern, hay, config);
        }
    }
}

#[test]
fn group_spans_match_across_engines() {
    let hay = "abcd";
    for config in grouped_engines() {
        let re = Regex::builder()
            .configure(config)
            .build("(a|ab)(c|bcd)(d*)")
            .unwrap();
        let caps = re.captures(hay).unwrap();
        let groups: Vec<Option<(usize, usize)>> =
            caps.iter().map(|g| g.map(|s| (s.start, s.end))).collect();
        assert_eq!(
            groups,
            vec![Some((0, 4)), Some((0, 1)), Some((1, 4)), Some((4, 4))],
            "{:?}",
            config
        );
    }
}
