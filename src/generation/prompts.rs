/// Prompt asking for a structured review of a PR diff.
pub fn pr_analysis(diff: &str) -> String {
    format!(
        "You are a senior software architect.

Analyze the following Pull Request diff and provide:

1. Summary of changes
2. Technical explanation
3. Impact analysis
4. Risks
5. Suggested documentation updates
6. Changelog entry

Format the answer as Markdown with one heading per section.

PR Diff:
{diff}
"
    )
}

/// Prompt asking for a system architecture document of the whole codebase.
pub fn architecture(codebase: &str) -> String {
    format!(
        "You are a senior software architect.

Study the following source code of an entire repository and write a system
architecture document covering:

1. System overview
2. Modules and their responsibilities
3. Architectural pattern
4. Data flow
5. Error handling
6. Security considerations
7. Scalability
8. Extension points

Format the answer as Markdown with one heading per section. Describe only
what the code shows.

Codebase:
{codebase}
"
    )
}
