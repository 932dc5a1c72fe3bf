//! CI environment detection
//!
//! The first matching provider wins, in this order: GitHub Actions, CircleCI,
//! Jenkins, Travis, GitLab, then a generic `CI=true`. An empty variable counts
//! as absent everywhere.

use crate::config::process_env;
use stories_core::CiInfo;
use tracing::debug;

enum Trigger {
    /// Variable equals `true`
    IsTrue(&'static str),
    /// Variable is set to anything
    IsSet(&'static str),
}

struct Provider {
    name: &'static str,
    trigger: Trigger,
    build_number: Option<&'static str>,
    url: Option<&'static str>,
}

// GitHub is handled separately: its URL is assembled from three variables.
const PROVIDERS: &[Provider] = &[
    Provider {
        name: "circleci",
        trigger: Trigger::IsTrue("CIRCLECI"),
        build_number: Some("CIRCLE_BUILD_NUM"),
        url: Some("CIRCLE_BUILD_URL"),
    },
    Provider {
        name: "jenkins",
        trigger: Trigger::IsSet("JENKINS_URL"),
        build_number: Some("BUILD_NUMBER"),
        url: Some("BUILD_URL"),
    },
    Provider {
        name: "travis",
        trigger: Trigger::IsTrue("TRAVIS"),
        build_number: Some("TRAVIS_BUILD_NUMBER"),
        url: Some("TRAVIS_BUILD_WEB_URL"),
    },
    Provider {
        name: "gitlab",
        trigger: Trigger::IsTrue("GITLAB_CI"),
        build_number: Some("CI_PIPELINE_IID"),
        url: Some("CI_PIPELINE_URL"),
    },
    Provider {
        name: "ci",
        trigger: Trigger::IsTrue("CI"),
        build_number: None,
        url: None,
    },
];

/// Detect the CI provider from the process environment
pub fn detect_ci() -> Option<CiInfo> {
    detect_ci_from(process_env)
}

/// Detect the CI provider from an explicit environment lookup
pub fn detect_ci_from<F>(lookup: F) -> Option<CiInfo>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let is_true = |key: &str| get(key).as_deref() == Some("true");

    let info = if is_true("GITHUB_ACTIONS") {
        let url = match (
            get("GITHUB_SERVER_URL"),
            get("GITHUB_REPOSITORY"),
            get("GITHUB_RUN_ID"),
        ) {
            (Some(server), Some(repo), Some(run)) => {
                Some(format!("{}/{}/actions/runs/{}", server, repo, run))
            }
            _ => None,
        };
        CiInfo {
            name: "github".to_string(),
            url,
            build_number: get("GITHUB_RUN_NUMBER"),
        }
    } else {
        let provider = PROVIDERS.iter().find(|p| match p.trigger {
            Trigger::IsTrue(key) => is_true(key),
            Trigger::IsSet(key) => get(key).is_some(),
        })?;
        CiInfo {
            name: provider.name.to_string(),
            url: provider.url.and_then(get),
            build_number: provider.build_number.and_then(get),
        }
    };

    debug!(target: "stories::ci", provider = %info.name, "CI environment detected");
    Some(info)
}
