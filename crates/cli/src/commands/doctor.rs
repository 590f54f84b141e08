use movequote_core::config::{AppConfig, LoadOptions};
use movequote_core::data::{DataBundle, DataDigests};
use movequote_core::errors::ApplicationError;
use movequote_core::estimate::Estimator;
use movequote_core::request::EstimateRequest;
use serde::Serialize;
use serde_json::json;

use super::{CommandResult, EXIT_CONFIG, EXIT_DATA, EXIT_INTERNAL, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    digests: Option<DataDigests>,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = exit_code_for(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();
    let mut digests = None;

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match DataBundle::load(&config.data) {
                Ok(data) => {
                    checks.push(DoctorCheck {
                        name: "data_documents",
                        status: CheckStatus::Pass,
                        details: format!(
                            "{} catalog items, {} packing skus",
                            data.index.items().len(),
                            data.packing.len()
                        ),
                    });
                    checks.push(check_medoids(&data));
                    checks.push(check_sample_estimate(&config, data.clone()));
                    digests = Some(data.digests);
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "data_documents",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.extend(skipped(&["category_medoids", "sample_estimate"], "data"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(skipped(
                &["data_documents", "category_medoids", "sample_estimate"],
                "configuration",
            ));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, digests, checks }
}

fn skipped(names: &[&'static str], cause: &str) -> Vec<DoctorCheck> {
    names
        .iter()
        .map(|name| DoctorCheck {
            name: *name,
            status: CheckStatus::Skipped,
            details: format!("skipped because {cause} did not load"),
        })
        .collect()
}

fn check_medoids(data: &DataBundle) -> DoctorCheck {
    let medoids = data.index.medoids();
    if medoids.is_empty() {
        return DoctorCheck {
            name: "category_medoids",
            status: CheckStatus::Fail,
            details: "catalog produced no category medoids".to_string(),
        };
    }
    DoctorCheck {
        name: "category_medoids",
        status: CheckStatus::Pass,
        details: format!("{} categories have a medoid", medoids.len()),
    }
}

fn check_sample_estimate(config: &AppConfig, data: DataBundle) -> DoctorCheck {
    let sample = json!({
        "items": {"sofa": 1, "box": 10},
        "distance_miles": 5,
        "move_date": "2025-03-12",
    });
    let result = EstimateRequest::from_value(sample)
        .map_err(ApplicationError::from)
        .and_then(|request| {
            Estimator::new(data, config.resolver.resolver_options())
                .estimate(&request, false, "doctor")
        });

    match result {
        Ok(estimate) => DoctorCheck {
            name: "sample_estimate",
            status: CheckStatus::Pass,
            details: format!(
                "sample move priced at {} {}",
                estimate.final_price, estimate.currency
            ),
        },
        Err(error) => DoctorCheck {
            name: "sample_estimate",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn exit_code_for(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };
    if report.overall_status == CheckStatus::Pass {
        EXIT_OK
    } else if failed("config_validation") {
        EXIT_CONFIG
    } else if failed("data_documents") || failed("category_medoids") {
        EXIT_DATA
    } else {
        EXIT_INTERNAL
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
