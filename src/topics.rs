//! Topic catalog for concept explanations.

/// A family of related programming topics and the lesson material shared by
/// everything in it.
#[derive(Debug)]
pub struct TopicCategory {
    /// Identifier returned as `category`.
    pub slug: &'static str,
    pub title: &'static str,
    /// Topic words that select this category. A word matches a keyword
    /// exactly or as its plural; a keyword ending in `*` is a stem and
    /// matches any word it prefixes.
    keywords: &'static [&'static str],
    pub overview: &'static str,
    pub key_points: &'static [&'static str],
    pub practice: &'static [&'static str],
}

/// Checked in order; the first category with a matching keyword wins.
static CATEGORIES: &[TopicCategory] = &[
    TopicCategory {
        slug: "error-handling",
        title: "Error Handling",
        keywords: &[
            "error", "exception", "try", "catch", "panic", "result", "option", "null", "nil",
            "rais*", "throw*",
        ],
        overview: "Error handling is how a program notices that something went wrong and decides what to do about it: recover, retry, report, or stop.",
        key_points: &[
            "Distinguish expected failures (bad input, missing files) from programmer bugs",
            "Handle errors at the level that has enough context to act on them",
            "Never silently swallow an error; at minimum log it",
            "Keep error messages specific: say what failed and with which input",
        ],
        practice: &[
            "Write a function that parses a number from user input and reports invalid input clearly",
            "Take a program that crashes on a missing file and make it print a helpful message instead",
        ],
    },
    TopicCategory {
        slug: "data-structures",
        title: "Data Structures",
        keywords: &[
            "array", "list", "dict*", "map", "hash*", "set", "tree", "graph", "stack", "queue",
            "linked", "heap", "tuple", "vector", "slice", "matri*",
        ],
        overview: "Data structures organize values so the operations a program performs most often are cheap.",
        key_points: &[
            "Pick the structure by the operations you need: lookup, insertion order, uniqueness, priority",
            "Know the cost of each operation (for example O(1) hash lookup versus O(n) list search)",
            "Prefer the standard library's implementations before writing your own",
            "Mutating a collection while iterating over it is a common source of bugs",
        ],
        practice: &[
            "Count word frequencies in a paragraph using a map",
            "Implement a stack and use it to check whether brackets in a string are balanced",
            "Find duplicates in a list first with nested loops, then with a set, and compare",
        ],
    },
    TopicCategory {
        slug: "oop",
        title: "Object-Oriented Programming",
        keywords: &[
            "class", "object", "inherit*", "polymorph*", "interface", "encapsulat*",
            "abstract*", "trait", "struct", "method", "constructor", "oop",
        ],
        overview: "Object-oriented programming bundles data with the operations on that data and lets different types share a common interface.",
        key_points: &[
            "Encapsulation: keep internal state private and expose meaningful operations",
            "Prefer composition over deep inheritance hierarchies",
            "Polymorphism lets callers depend on an interface instead of a concrete type",
            "Each type should have one clear responsibility",
        ],
        practice: &[
            "Model a bank account with deposit and withdraw operations that reject invalid amounts",
            "Define a Shape interface with an area method and implement it for circles and rectangles",
        ],
    },
    TopicCategory {
        slug: "concepts",
        title: "Core Concepts",
        keywords: &[
            "recursi*", "closure", "goroutine", "concurren*", "parallel*", "async", "await",
            "promise", "thread*", "generic*", "lambda", "callback", "iterat*", "generat*",
            "pointer", "memory", "ownership", "borrow*", "channel", "higher", "functional",
            "event",
        ],
        overview: "These are the ideas that shape how programs are structured and executed beyond straight-line code: deferred work, shared state, and abstraction over behavior.",
        key_points: &[
            "Understand what runs when: eagerly, lazily, or concurrently",
            "Be explicit about who owns data and who may change it",
            "Shared mutable state between concurrent tasks needs synchronization",
            "Small, focused examples are the fastest way to build intuition",
        ],
        practice: &[
            "Write the same task sequentially and concurrently, then measure both",
            "Trace a small example by hand, writing down each step as it executes",
        ],
    },
    TopicCategory {
        slug: "fundamentals",
        title: "Fundamentals",
        keywords: &[
            "variable", "loop", "function", "condition*", "if", "operator", "type", "string",
            "syntax", "scope", "input", "output", "boolean", "number", "comment",
        ],
        overview: "Fundamentals are the building blocks every program is made of: values, names, decisions, and repetition.",
        key_points: &[
            "Give variables names that describe what they hold",
            "Keep functions short and focused on one task",
            "Check boundary cases: empty input, zero, negative numbers",
            "Read error messages carefully; they usually point at the line that failed",
        ],
        practice: &[
            "Write a program that prints the multiplication table for a number",
            "Write a function that returns the largest of three numbers, then test it with ties",
        ],
    },
];

static GENERAL: TopicCategory = TopicCategory {
    slug: "general",
    title: "Programming Topic",
    keywords: &[],
    overview: "This topic is best learned by combining a short explanation with hands-on experiments.",
    key_points: &[
        "Start from a minimal working example",
        "Change one thing at a time and observe the effect",
        "Read the official documentation for the language feature",
        "Explain the idea in your own words to check your understanding",
    ],
    practice: &[
        "Write the smallest program that uses this topic",
        "Extend it with one realistic requirement and handle its edge cases",
    ],
};

/// Classify a topic by keyword. Unknown topics fall back to `general`.
pub fn classify(topic: &str) -> &'static TopicCategory {
    let lowered = topic.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    CATEGORIES
        .iter()
        .find(|category| {
            category
                .keywords
                .iter()
                .any(|kw| words.iter().any(|w| keyword_matches(kw, w)))
        })
        .unwrap_or(&GENERAL)
}

fn keyword_matches(keyword: &str, word: &str) -> bool {
    if let Some(stem) = keyword.strip_suffix('*') {
        return word.starts_with(stem);
    }
    let singular = word.strip_suffix('s');
    word == keyword
        || singular == Some(keyword)
        || singular.and_then(|w| w.strip_suffix('e')) == Some(keyword)
}

/// Short note about how the language approaches things, if it is known.
pub fn language_note(language: &str) -> Option<&'static str> {
    let note = match language {
        "python" => "Python favors readability: follow PEP 8, use built-ins like enumerate and zip, and let exceptions propagate to a handler that can act on them.",
        "javascript" => "JavaScript is single-threaded with an event loop: prefer const/let, use === for comparisons, and await promises instead of nesting callbacks.",
        "typescript" => "TypeScript adds static types on top of JavaScript: let the compiler catch mistakes by typing function signatures and avoiding any.",
        "go" => "Go keeps things simple: errors are returned as values, goroutines are cheap, and channels are the idiomatic way to share data between them.",
        "rust" => "Rust checks ownership and borrowing at compile time: errors are values of type Result, and the compiler prevents data races.",
        "java" => "Java is strongly typed and class-based: use checked exceptions deliberately and prefer the collections framework over arrays.",
        "cpp" => "C++ gives direct control over memory: prefer RAII, smart pointers and standard containers over manual new/delete.",
        "c" => "C is close to the machine: track buffer sizes explicitly and check every return value.",
        "csharp" => "C# runs on .NET: use properties, LINQ for collection queries, and async/await for I/O.",
        "ruby" => "Ruby optimizes for programmer happiness: blocks and enumerables replace most explicit loops.",
        _ => return None,
    };
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goroutines_are_concepts() {
        assert_eq!(classify("goroutines").slug, "concepts");
        assert_eq!(classify("Async/Await").slug, "concepts");
    }

    #[test]
    fn test_categories() {
        assert_eq!(classify("linked lists").slug, "data-structures");
        assert_eq!(classify("Classes and Inheritance").slug, "oop");
        assert_eq!(classify("try/except").slug, "error-handling");
        assert_eq!(classify("for loops").slug, "fundamentals");
    }

    #[test]
    fn test_short_keywords_match_whole_words() {
        assert_eq!(classify("project setup").slug, "general");
        assert_eq!(classify("Settings").slug, "general");
        assert_eq!(classify("iframes").slug, "general");
        assert_eq!(classify("optional chaining").slug, "general");
        assert_eq!(classify("sets and maps").slug, "data-structures");
        assert_eq!(classify("if statements").slug, "fundamentals");
        assert_eq!(classify("Concurrency").slug, "concepts");
        assert_eq!(classify("hashmaps").slug, "data-structures");
    }

    #[test]
    fn test_unknown_topic_is_general() {
        assert_eq!(classify("quantum basket weaving").slug, "general");
        assert_eq!(classify("").slug, "general");
    }

    #[test]
    fn test_language_note() {
        assert!(language_note("go").is_some_and(|n| n.contains("goroutines")));
        assert!(language_note("cobol").is_none());
    }
}
