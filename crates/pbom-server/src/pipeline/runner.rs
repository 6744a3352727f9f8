//! Runner environment inference from job metadata.

use jiff::Timestamp;
use pbom_core::Runner;
use pbom_github::Job;
use strum::{AsRefStr, Display};

/// Runner group of GitHub-hosted runners.
const HOSTED_RUNNER_GROUP: &str = "GitHub Actions";

/// Label GitHub attaches to every self-hosted runner.
const SELF_HOSTED_LABEL: &str = "self-hosted";

/// Operating system of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
pub enum RunnerOs {
    Linux,
    #[strum(serialize = "macOS")]
    MacOs,
    Windows,
}

/// CPU architecture of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
pub enum RunnerArch {
    #[strum(serialize = "X64")]
    X64,
    #[strum(serialize = "ARM64")]
    Arm64,
}

#[derive(Debug, Clone, Copy)]
enum Match {
    Exact(&'static str),
    Contains(&'static str),
}

impl Match {
    fn matches(self, lowercase: &str) -> bool {
        match self {
            Self::Exact(value) => lowercase == value,
            Self::Contains(needle) => lowercase.contains(needle),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Inferred {
    Os(RunnerOs),
    Arch(RunnerArch),
}

/// Label rules in priority order. Each label is lowercased before matching.
const LABEL_RULES: &[(Match, Inferred)] = &[
    (Match::Contains("ubuntu"), Inferred::Os(RunnerOs::Linux)),
    (Match::Exact("linux"), Inferred::Os(RunnerOs::Linux)),
    (Match::Contains("macos"), Inferred::Os(RunnerOs::MacOs)),
    (Match::Contains("windows"), Inferred::Os(RunnerOs::Windows)),
    (Match::Exact("x64"), Inferred::Arch(RunnerArch::X64)),
    (Match::Exact("amd64"), Inferred::Arch(RunnerArch::X64)),
    (Match::Exact("arm64"), Inferred::Arch(RunnerArch::Arm64)),
    (Match::Exact("aarch64"), Inferred::Arch(RunnerArch::Arm64)),
];

/// Rules applied to the runner name when no label names the OS.
const NAME_RULES: &[(&str, RunnerOs)] = &[
    ("ubuntu", RunnerOs::Linux),
    ("linux", RunnerOs::Linux),
    ("macos", RunnerOs::MacOs),
    ("windows", RunnerOs::Windows),
];

const DEFAULT_OS: RunnerOs = RunnerOs::Linux;
const DEFAULT_ARCH: RunnerArch = RunnerArch::X64;

/// Infers the runner of a run from its first job.
///
/// Returns `None` when the run has no jobs.
pub fn infer_runner(jobs: &[Job]) -> Option<Runner> {
    let job = jobs.first()?;

    let mut self_hosted = job
        .runner_group_name
        .as_deref()
        .is_some_and(|group| !group.is_empty() && group != HOSTED_RUNNER_GROUP);
    let mut os = None;
    let mut arch = None;

    for label in &job.labels {
        let label = label.to_lowercase();
        if label == SELF_HOSTED_LABEL {
            self_hosted = true;
            continue;
        }

        for (rule, inferred) in LABEL_RULES {
            if !rule.matches(&label) {
                continue;
            }

            match inferred {
                Inferred::Os(value) => {
                    os.get_or_insert(*value);
                }
                Inferred::Arch(value) => {
                    arch.get_or_insert(*value);
                }
            }
            break;
        }
    }

    let runner_name = job.runner_name.as_deref().filter(|name| !name.is_empty());
    let os = os
        .or_else(|| runner_name.and_then(os_from_name))
        .unwrap_or(DEFAULT_OS);
    let arch = arch.unwrap_or(DEFAULT_ARCH);

    Some(Runner {
        os: Some(os.to_string()),
        arch: Some(arch.to_string()),
        name: runner_name.map(str::to_owned),
        self_hosted,
    })
}

fn os_from_name(name: &str) -> Option<RunnerOs> {
    let name = name.to_lowercase();
    NAME_RULES
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|(_, os)| *os)
}

/// Returns the earliest job start and the latest job completion.
pub fn job_window(jobs: &[Job]) -> (Option<Timestamp>, Option<Timestamp>) {
    let started_at = jobs.iter().filter_map(|job| job.started_at).min();
    let completed_at = jobs.iter().filter_map(|job| job.completed_at).max();
    (started_at, completed_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(labels: &[&str], group: Option<&str>, name: Option<&str>) -> Job {
        Job {
            labels: labels.iter().map(|l| (*l).to_owned()).collect(),
            runner_group_name: group.map(str::to_owned),
            runner_name: name.map(str::to_owned),
            ..Job::default()
        }
    }

    fn ts(value: &str) -> Timestamp {
        value.parse().unwrap()
    }

    #[test]
    fn self_hosted_arm_linux() {
        let runner = infer_runner(&[job(&["self-hosted", "linux", "arm64"], None, None)]).unwrap();

        assert_eq!(runner.os.as_deref(), Some("Linux"));
        assert_eq!(runner.arch.as_deref(), Some("ARM64"));
        assert!(runner.self_hosted);
    }

    #[test]
    fn hosted_ubuntu_defaults_to_x64() {
        let jobs = [job(
            &["ubuntu-latest"],
            Some("GitHub Actions"),
            Some("GitHub Actions 2"),
        )];
        let runner = infer_runner(&jobs).unwrap();

        assert_eq!(runner.os.as_deref(), Some("Linux"));
        assert_eq!(runner.arch.as_deref(), Some("X64"));
        assert_eq!(runner.name.as_deref(), Some("GitHub Actions 2"));
        assert!(!runner.self_hosted);
    }

    #[test]
    fn empty_jobs_yield_no_runner() {
        assert!(infer_runner(&[]).is_none());
    }

    #[test]
    fn custom_group_is_self_hosted() {
        let runner = infer_runner(&[job(&["gpu"], Some("build-farm"), None)]).unwrap();
        assert!(runner.self_hosted);
    }

    #[test]
    fn labels_match_case_insensitively() {
        let runner = infer_runner(&[job(&["MacOS-14", "ARM64"], None, None)]).unwrap();

        assert_eq!(runner.os.as_deref(), Some("macOS"));
        assert_eq!(runner.arch.as_deref(), Some("ARM64"));
    }

    #[test]
    fn first_matching_label_wins() {
        let runner =
            infer_runner(&[job(&["windows-latest", "ubuntu-22.04", "amd64", "arm64"], None, None)])
                .unwrap();

        assert_eq!(runner.os.as_deref(), Some("Windows"));
        assert_eq!(runner.arch.as_deref(), Some("X64"));
    }

    #[test]
    fn os_falls_back_to_runner_name() {
        let runner = infer_runner(&[job(&["gpu"], None, Some("Windows-Builder-3"))]).unwrap();
        assert_eq!(runner.os.as_deref(), Some("Windows"));

        let runner = infer_runner(&[job(&["gpu"], None, Some("box-7"))]).unwrap();
        assert_eq!(runner.os.as_deref(), Some("Linux"));
    }

    #[test]
    fn only_first_job_is_used() {
        let jobs = [
            job(&["ubuntu-latest"], None, None),
            job(&["self-hosted", "windows"], None, None),
        ];
        let runner = infer_runner(&jobs).unwrap();

        assert_eq!(runner.os.as_deref(), Some("Linux"));
        assert!(!runner.self_hosted);
    }

    #[test]
    fn window_spans_all_jobs() {
        let jobs = [
            Job {
                started_at: Some(ts("2025-03-01T10:02:00Z")),
                completed_at: Some(ts("2025-03-01T10:05:00Z")),
                ..Job::default()
            },
            Job {
                started_at: Some(ts("2025-03-01T10:00:00Z")),
                completed_at: Some(ts("2025-03-01T10:08:00Z")),
                ..Job::default()
            },
        ];

        let (started, completed) = job_window(&jobs);
        assert_eq!(started, Some(ts("2025-03-01T10:00:00Z")));
        assert_eq!(completed, Some(ts("2025-03-01T10:08:00Z")));
    }

    #[test]
    fn window_without_timestamps_is_empty() {
        assert_eq!(job_window(&[Job::default()]), (None, None));
        assert_eq!(job_window(&[]), (None, None));
    }
}
