use crate::{AgentError, Decision, DecisionOutcome, RouterStats, RunSession};
use jester_core::ArchetypeSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub runs: u32,
    pub stats: RouterStats,
    pub archetype: ArchetypeSnapshot,
    pub decisions: Vec<Decision>,
}

impl SessionReport {
    pub fn from_session(session: &RunSession) -> Self {
        Self {
            runs: session.runs(),
            stats: session.stats().clone(),
            archetype: session.tracker().snapshot(),
            decisions: session.decisions().cloned().collect(),
        }
    }

    pub fn to_text_report(&self) -> String {
        let stats = &self.stats;
        let mut lines = vec![
            format!(
                "archetype: current={} leader={} locked_at={}",
                self.archetype.current.id(),
                self.archetype.leader.id(),
                self.archetype
                    .locked_at
                    .map(|ante| ante.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            format!(
                "decisions: total={} mechanical={} strategic={}",
                stats.decisions, stats.mechanical, stats.strategic
            ),
            format!(
                "outcomes: rule={} advisory={} fallback={} safe_default={}",
                stats.rule, stats.advisory, stats.fallback, stats.safe_default
            ),
            format!(
                "advisory: escalations={} attempts={} timeouts={} transport={} schema={} \
                 illegal={} fallback_rate={:.2}",
                stats.escalations,
                stats.advisory_attempts,
                stats.timeouts,
                stats.transport_errors,
                stats.schema_errors,
                stats.illegal_actions,
                stats.fallback_rate()
            ),
            String::new(),
            "confidence:".to_string(),
        ];
        if self.archetype.confidence.is_empty() {
            lines.push("  (none)".to_string());
        } else {
            for (archetype, value) in &self.archetype.confidence {
                lines.push(format!("  {:<11} {:.2}", archetype.id(), value));
            }
        }
        lines.push(String::new());
        lines.push("decisions:".to_string());
        for (step, decision) in self.decisions.iter().enumerate() {
            lines.push(format!("  {:>4} | {}", step + 1, decision.summary()));
            if let Some(evaluation) = decision.evaluation.as_ref() {
                lines.push(format!("    score: {}", evaluation.summary()));
            }
            match &decision.outcome {
                DecisionOutcome::Advisory { rationale } => {
                    push_block(&mut lines, "advisory", rationale);
                }
                DecisionOutcome::Fallback { error } => {
                    lines.push(format!("    fallback: {error}"));
                }
                _ => {}
            }
            for warning in &decision.warnings {
                lines.push(format!("    warning: {warning}"));
            }
        }
        lines.join("\n")
    }
}

fn push_block(lines: &mut Vec<String>, label: &str, text: &str) {
    for row in text.lines() {
        lines.push(format!("    {label}: {row}"));
    }
}

pub fn write_json(path: &Path, report: &SessionReport) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(report)?;
    fs::write(path, body)?;
    Ok(())
}

pub fn write_text(path: &Path, report: &SessionReport) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_text_report())?;
    Ok(())
}
