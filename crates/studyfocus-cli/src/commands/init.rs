//! The `studyfocus init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("studyfocus.toml").exists() {
        println!("studyfocus.toml already exists, skipping.");
    } else {
        std::fs::write("studyfocus.toml", SAMPLE_CONFIG)?;
        println!("Created studyfocus.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit studyfocus.toml to match your response export");
    println!("  2. Run: studyfocus validate --responses responses.csv");
    println!("  3. Run: studyfocus report --responses responses.csv --test-id <TEST>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studyfocus configuration

# Columns that together identify a student.
identity_columns = ["firstName", "lastName"]

[pipeline]
# Score at or above which a concept counts as passed.
passing_threshold = 0.5

[weights]
# Tests whose id contains any of these are left out of concept weights.
excluded_tests = ["BB", "YL_6_PP_SAT_S0111"]

[focus]
passing_threshold = 0.6
# Concepts need at least this many wrong answers to be recommended.
min_wrong = 5
limit = 5

[opportunity]
limit = 5

[concepts]
# Broad concepts dropped from the data.
excluded = []
# CSV with concept,subject,broad_concept columns, relative to this file.
# map_file = "concepts.csv"

[report]
output_dir = "./studyfocus-reports"
subjects = ["sentence", "reading", "math", "writing"]
"#;
