use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use master_scheduler::parser::{load_snapshot_from_dir, validate_snapshot};
use master_scheduler::pipeline::{run_pipeline, PipelineOptions};
use master_scheduler::reporter::{print_summary, write_outputs};
use master_scheduler::resolver::ResolveOptions;
use master_scheduler::sources::{Clock, SystemClock};
use master_scheduler::state::ScheduleState;
use master_scheduler::{detector, fitness};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "master-scheduler")]
#[command(about = "Conflict-driven K-12 master schedule engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo with generated sample data
    Demo,

    /// Generate a schedule from a data directory
    Schedule {
        /// Directory containing input JSON files
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for schedule artifacts
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Maximum auto-resolve passes
        #[arg(long, default_value_t = 10)]
        max_passes: u32,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Re-detect conflicts on a previously saved schedule
    Validate {
        /// Path to schedule.json written by the schedule command
        #[arg(short, long)]
        schedule: PathBuf,

        /// Directory containing the input data
        #[arg(short, long)]
        data: PathBuf,

        /// Show every conflict, not just the totals
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => run_demo(),
        Commands::Schedule {
            data,
            output,
            max_passes,
            quiet,
        } => run_schedule(&data, &output, max_passes, quiet),
        Commands::Validate {
            schedule,
            data,
            verbose,
        } => run_validate(&schedule, &data, verbose),
    }
}

fn run_demo() -> Result<()> {
    println!("{}", "Master Scheduler Demo".bold().cyan());
    println!("{}", "─".repeat(40));

    let demo_path = PathBuf::from("data/demo");
    if !demo_path.join("students.json").exists() {
        println!("{}", "Demo data not found. Creating sample data...".yellow());
        create_demo_data(&demo_path)?;
    }

    run_schedule(&demo_path, &PathBuf::from("output"), 10, false)
}

fn run_schedule(data: &PathBuf, output: &PathBuf, max_passes: u32, quiet: bool) -> Result<()> {
    let (snapshot, config) =
        load_snapshot_from_dir(data).context("Failed to load input data")?;

    let clock = SystemClock;
    let validation = validate_snapshot(&snapshot, &config, clock.now().date_naive())?;
    if !quiet {
        for warning in &validation.warnings {
            println!("{} {}", "Warning:".yellow(), warning);
        }
        println!(
            "Loaded {} students, {} teachers, {} courses, {} rooms",
            snapshot.students().count(),
            snapshot.teachers().count(),
            snapshot.courses().count(),
            snapshot.rooms().count()
        );
        println!("\nGenerating schedule...\n");
    }

    let options = PipelineOptions {
        quiet,
        resolve: ResolveOptions {
            max_iterations: max_passes,
            ..Default::default()
        },
    };
    let outcome = run_pipeline(&snapshot, &config, &clock, options)?;

    if !quiet {
        print_summary(&outcome, &config);
    }
    write_outputs(&outcome, output)?;
    if !quiet {
        println!(
            "Artifacts written to: {}",
            output.display().to_string().green()
        );
    }

    Ok(())
}

fn run_validate(schedule_path: &PathBuf, data: &PathBuf, verbose: bool) -> Result<()> {
    let (snapshot, config) = load_snapshot_from_dir(data)?;

    let schedule_json = std::fs::read_to_string(schedule_path)
        .with_context(|| format!("Failed to read {}", schedule_path.display()))?;
    let state: ScheduleState = serde_json::from_str(&schedule_json)?;

    let now = SystemClock.now();
    let report = detector::detect(&state, &snapshot, &config, now);
    let score = fitness::evaluate(&report.conflicts, &state, &config);

    if report.count_hard() == 0 {
        println!("{}", "✓ Schedule is feasible".green().bold());
    } else {
        println!(
            "{}",
            format!("✗ Schedule has {} hard conflicts", report.count_hard())
                .red()
                .bold()
        );
    }

    if verbose {
        for conflict in &report.conflicts {
            println!(
                "  [{}] {}: {}",
                conflict.severity,
                conflict.kind,
                conflict.message
            );
        }
        for warning in &report.warnings {
            println!("  {} {}", "warning:".yellow(), warning);
        }
    } else {
        println!("Conflicts: {}", report.conflicts.len());
    }

    println!("\nFitness: {:.1}", score.total);
    Ok(())
}

fn create_demo_data(path: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(path)?;

    let students = serde_json::json!([
        {"id": "s001", "name": "Alice Johnson", "grade": 9, "medical_notes": "", "has_iep": false},
        {"id": "s002", "name": "Bob Smith", "grade": 9, "medical_notes": "asthma", "has_iep": false},
        {"id": "s003", "name": "Carol Davis", "grade": 9, "medical_notes": "", "has_iep": true, "iep_review_date": "2026-01-15"},
        {"id": "s004", "name": "David Wilson", "grade": 10, "medical_notes": "", "has_iep": false},
        {"id": "s005", "name": "Eve Brown", "grade": 10, "medical_notes": "", "has_iep": false},
        {"id": "s006", "name": "Frank Miller", "grade": 10, "medical_notes": "knee injury - no physical education", "has_iep": false},
        {"id": "s007", "name": "Grace Lee", "grade": 11, "medical_notes": "", "has_iep": false},
        {"id": "s008", "name": "Henry Taylor", "grade": 11, "medical_notes": "", "has_iep": false},
        {"id": "s009", "name": "Ivy Chen", "grade": 12, "medical_notes": "", "has_iep": false},
        {"id": "s010", "name": "Jack Robinson", "grade": 12, "medical_notes": "", "has_iep": false}
    ]);
    std::fs::write(
        path.join("students.json"),
        serde_json::to_string_pretty(&students)?,
    )?;

    let teachers = serde_json::json!([
        {"id": "t001", "name": "Ms. Anderson", "department": "Mathematics", "certifications": [
            {"name": "Secondary Mathematics", "subjects": ["Mathematics"], "grade_range": [9, 12]}
        ]},
        {"id": "t002", "name": "Mr. Baker", "department": "English", "certifications": [
            {"name": "Secondary English", "subjects": ["English"], "grade_range": [9, 12]}
        ]},
        {"id": "t003", "name": "Dr. Clark", "department": "Science", "certifications": [
            {"name": "Secondary Science", "subjects": ["Science"], "grade_range": [9, 12]}
        ]},
        {"id": "t004", "name": "Ms. Davis", "department": "Social Studies", "certifications": [
            {"name": "Secondary History", "subjects": ["History", "SocialStudies"], "grade_range": [9, 12]}
        ]},
        {"id": "t005", "name": "Mr. Evans", "department": "Fine Arts", "certifications": [
            {"name": "All-Level Art", "subjects": ["Art"]},
            {"name": "All-Level Music", "subjects": ["Music"]}
        ]},
        {"id": "t006", "name": "Coach Fisher", "department": "Athletics", "certifications": [
            {"name": "Physical Education", "subjects": ["PhysicalEducation"]}
        ]},
        {"id": "t007", "name": "Sra. Gomez", "department": "World Languages", "certifications": [
            {"name": "Spanish", "subjects": ["ForeignLanguage"], "grade_range": [9, 12]}
        ]}
    ]);
    std::fs::write(
        path.join("teachers.json"),
        serde_json::to_string_pretty(&teachers)?,
    )?;

    let courses = serde_json::json!([
        {"id": "eng1", "name": "English 1", "subject": "English", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary English"], "num_sections_needed": 2},
        {"id": "eng2", "name": "English 2", "subject": "English", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary English"], "num_sections_needed": 2},
        {"id": "alg1", "name": "Algebra I", "subject": "Mathematics", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary Mathematics"], "num_sections_needed": 2},
        {"id": "geo", "name": "Geometry", "subject": "Mathematics", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary Mathematics"], "num_sections_needed": 2},
        {"id": "bio", "name": "Biology", "subject": "Science", "level": "HighSchool", "max_students": 24, "required_certifications": ["Secondary Science"], "requires_lab": true, "num_sections_needed": 2},
        {"id": "chem", "name": "Chemistry", "subject": "Science", "level": "HighSchool", "max_students": 24, "required_certifications": ["Secondary Science"], "requires_lab": true, "num_sections_needed": 2},
        {"id": "amhist", "name": "American History", "subject": "History", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary History"], "num_sections_needed": 2},
        {"id": "worldhist", "name": "World History", "subject": "History", "level": "HighSchool", "max_students": 25, "required_certifications": ["Secondary History"], "num_sections_needed": 2},
        {"id": "art1", "name": "Art Foundations", "subject": "Art", "max_students": 20, "required_certifications": ["All-Level Art"], "num_sections_needed": 2},
        {"id": "band", "name": "Concert Band", "subject": "Music", "max_students": 40, "required_certifications": ["All-Level Music"], "is_singleton": true},
        {"id": "span1", "name": "Spanish 1", "subject": "ForeignLanguage", "max_students": 25, "required_certifications": ["Spanish"], "num_sections_needed": 2},
        {"id": "pe", "name": "PE-Fitness", "subject": "PhysicalEducation", "max_students": 30, "required_certifications": ["Physical Education"], "num_sections_needed": 2}
    ]);
    std::fs::write(
        path.join("courses.json"),
        serde_json::to_string_pretty(&courses)?,
    )?;

    let rooms = serde_json::json!([
        {"id": "101", "number": "101", "building": "Main", "floor": 1, "capacity": 30, "room_type": "StandardClassroom"},
        {"id": "102", "number": "102", "building": "Main", "floor": 1, "capacity": 30, "room_type": "StandardClassroom"},
        {"id": "103", "number": "103", "building": "Main", "floor": 1, "capacity": 30, "room_type": "StandardClassroom"},
        {"id": "201", "number": "201", "building": "Main", "floor": 2, "capacity": 30, "room_type": "StandardClassroom"},
        {"id": "202", "number": "202", "building": "Main", "floor": 2, "capacity": 30, "room_type": "StandardClassroom"},
        {"id": "lab1", "number": "Lab 1", "building": "Main", "floor": 2, "capacity": 24, "room_type": "ScienceLab", "equipment": ["fume hood"]},
        {"id": "lab2", "number": "Lab 2", "building": "Main", "floor": 2, "capacity": 24, "room_type": "ScienceLab"},
        {"id": "studio", "number": "Art Studio", "building": "Annex", "floor": 1, "capacity": 20, "room_type": "ArtStudio", "equipment": ["kiln"]},
        {"id": "bandhall", "number": "Band Hall", "building": "Annex", "floor": 1, "capacity": 60, "room_type": "BandRoom"},
        {"id": "gym", "number": "Gymnasium", "building": "Annex", "floor": 1, "capacity": 80, "room_type": "Gymnasium"}
    ]);
    std::fs::write(path.join("rooms.json"), serde_json::to_string_pretty(&rooms)?)?;

    let history = serde_json::json!({
        "s004": [{"course_id": "alg1", "final_grade": 82, "term": "2024-25"}, {"course_id": "eng1", "final_grade": 78, "term": "2024-25"}],
        "s005": [{"course_id": "alg1", "final_grade": 91, "term": "2024-25"}, {"course_id": "eng1", "final_grade": 88, "term": "2024-25"}, {"course_id": "bio", "final_grade": 85, "term": "2024-25"}],
        "s006": [{"course_id": "alg1", "final_grade": 74, "term": "2024-25"}, {"course_id": "eng1", "final_grade": 80, "term": "2024-25"}],
        "s007": [{"course_id": "geo", "final_grade": 88, "term": "2024-25"}, {"course_id": "eng2", "final_grade": 84, "term": "2024-25"}, {"course_id": "bio", "final_grade": 90, "term": "2024-25"}],
        "s008": [{"course_id": "geo", "final_grade": 71, "term": "2024-25"}, {"course_id": "eng2", "final_grade": 75, "term": "2024-25"}],
        "s009": [{"course_id": "chem", "final_grade": 89, "term": "2024-25"}, {"course_id": "amhist", "final_grade": 92, "term": "2024-25"}],
        "s010": [{"course_id": "chem", "final_grade": 65, "term": "2024-25"}, {"course_id": "amhist", "final_grade": 70, "term": "2024-25"}]
    });
    std::fs::write(
        path.join("history.json"),
        serde_json::to_string_pretty(&history)?,
    )?;

    let prereqs = serde_json::json!({
        "geo": [[{"course": "alg1", "min_grade": 60}]],
        "chem": [[{"course": "bio", "min_grade": 60}]],
        "eng2": [[{"course": "eng1", "min_grade": 60}]],
        "worldhist": [[{"course": "amhist", "min_grade": 60}]]
    });
    std::fs::write(
        path.join("prereqs.json"),
        serde_json::to_string_pretty(&prereqs)?,
    )?;

    println!("{}", "Demo data created successfully!".green());
    Ok(())
}
