use serde::Deserialize;
use std::sync::Arc;

use super::targets::{category, RiskLevel, Target, DOCKER_BUILD_CACHE, DOCKER_IMAGE_PREFIX};
use super::Scanner;
use crate::common::{CancelToken, CommandRunner, ScanError, SystemRunner};

/// Dangling images and build cache reported by the Docker CLI
pub struct DockerScanner {
    runner: Arc<dyn CommandRunner>,
}

impl Default for DockerScanner {
    fn default() -> Self {
        Self::new(Arc::new(SystemRunner::default()))
    }
}

/// One line of `docker system df --format '{{json .}}'`
#[derive(Debug, Deserialize)]
struct DfLine {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Size", default)]
    size: String,
    #[serde(rename = "Reclaimable", default)]
    reclaimable: String,
}

impl DockerScanner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn dangling_images(&self, cancel: &CancelToken) -> Result<Option<Vec<Target>>, ScanError> {
        let out = match self.runner.run(
            cancel,
            "docker",
            &["images", "-f", "dangling=true", "--format", "{{.ID}}\t{{.Size}}"],
        ) {
            Ok(out) => out,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                // Daemon not running, skip silently
                tracing::debug!("docker images failed: {}", e);
                return Ok(None);
            }
        };

        let stdout = String::from_utf8_lossy(&out);
        let mut targets = Vec::new();
        for line in stdout.lines() {
            let mut parts = line.splitn(2, '\t');
            let id = parts.next().unwrap_or("").trim();
            if id.is_empty() {
                continue;
            }
            let size_str = parts.next().map(str::trim).unwrap_or("");
            let description = if size_str.is_empty() {
                "Dangling image".to_string()
            } else {
                format!("Dangling image ({})", size_str)
            };
            targets.push(Target {
                path: format!("{}{}", DOCKER_IMAGE_PREFIX, id),
                size: parse_size_string(size_str),
                category: category::DOCKER.to_string(),
                description,
                risk: RiskLevel::Moderate,
                mod_time: None,
                is_dir: false,
            });
        }
        Ok(Some(targets))
    }

    fn build_cache(&self, cancel: &CancelToken) -> Result<Option<Target>, ScanError> {
        let out = match self
            .runner
            .run(cancel, "docker", &["system", "df", "--format", "{{json .}}"])
        {
            Ok(out) => out,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                tracing::debug!("docker system df failed: {}", e);
                return Ok(None);
            }
        };

        let stdout = String::from_utf8_lossy(&out);
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let df: DfLine = match serde_json::from_str(line) {
                Ok(df) => df,
                Err(e) => {
                    tracing::debug!("skipping malformed docker df line: {}", e);
                    continue;
                }
            };
            if df.kind != "Build Cache" {
                continue;
            }
            return Ok(Some(Target {
                path: DOCKER_BUILD_CACHE.to_string(),
                size: parse_size_string(&df.reclaimable),
                category: category::DOCKER.to_string(),
                description: format!("Build cache ({}, {} reclaimable)", df.size, df.reclaimable),
                risk: RiskLevel::Safe,
                mod_time: None,
                is_dir: false,
            }));
        }
        Ok(None)
    }
}

impl Scanner for DockerScanner {
    fn name(&self) -> &str {
        category::DOCKER
    }

    fn description(&self) -> &str {
        "Docker images, containers, and build cache"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Moderate
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        if self.runner.look_path("docker").is_none() {
            return Ok(Vec::new());
        }

        // A failed image listing means the daemon is unreachable; df would fail too
        let mut targets = match self.dangling_images(cancel)? {
            Some(images) => images,
            None => return Ok(Vec::new()),
        };
        if let Some(cache) = self.build_cache(cancel)? {
            targets.push(cache);
        }
        Ok(targets)
    }
}

/// Parse Docker size strings like "2.5GB", "150MB", "1.2kB", "1.8GB (72%)".
///
/// Docker reports decimal units. Unparseable input yields 0.
pub fn parse_size_string(s: &str) -> u64 {
    let s = s.split_whitespace().next().unwrap_or("");
    if s.is_empty() {
        return 0;
    }

    // Split numeric part from unit
    let num_end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let num: f64 = match s[..num_end].parse() {
        Ok(n) => n,
        Err(_) => return 0,
    };
    let unit = s[num_end..].trim().to_uppercase();

    let multiplier = match unit.as_str() {
        "" | "B" => 1.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return 0,
    };
    (num * multiplier) as u64
}
