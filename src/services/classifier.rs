use crate::config::ClassifierConfig;
use crate::constants::CLASSIFY_MAX_TOKENS;
use crate::error::{ClassificationError, GenerationError};
use crate::models::time_window::{parse_local_range, resolve_local_range};
use crate::models::{ClassifiedPoi, PoiCategory, Stop, TimeRange, TravelMode};
use crate::services::llm::{StructuredPrompt, TextGenerator};
use crate::services::validator::validate_coordinates;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You classify real-world places for a one-day itinerary. \
Use only the names, addresses and coordinates provided.
Return one JSON object of the form {\"classifications\": [...]} with exactly one record per \
place and no other fields. Each record has: index, name, latitude, longitude, category, \
preferred_window, rationale and optionally stay_duration_minutes.
- index, name, latitude and longitude must be copied verbatim from the input.
- category is one of: food, culture, nature, landmark, shopping, other.
- preferred_window is a local time range like \"17:00-19:00\".
- stay_duration_minutes is a whole number of minutes.
Be decisive. Return JSON only; no prose.";

/// Context shared by every stop in a classification call.
#[derive(Debug, Clone)]
pub struct TripContext {
    pub start_name: String,
    pub window: TimeRange,
    pub mode: TravelMode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassificationResponse {
    classifications: Vec<RawClassification>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassification {
    index: usize,
    #[allow(dead_code)]
    name: String,
    latitude: f64,
    longitude: f64,
    category: String,
    preferred_window: String,
    rationale: String,
    #[serde(default)]
    stay_duration_minutes: Option<u32>,
}

/// Outcome of a single failed attempt.
enum AttemptFailure {
    Format(String),
    Generation(GenerationError),
}

pub struct PoiClassifier {
    generator: Arc<dyn TextGenerator>,
    config: ClassifierConfig,
}

impl PoiClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>, config: ClassifierConfig) -> Self {
        PoiClassifier { generator, config }
    }

    /// Classify every stop in one structured call.
    ///
    /// Format violations and generation failures are retried up to
    /// `max_retries` times. Coordinate drift fails immediately and is never
    /// retried. On success the result holds one entry per stop, in stop
    /// order, with coordinates copied from the stop.
    pub async fn classify(
        &self,
        stops: &[Stop],
        context: &TripContext,
    ) -> Result<Vec<ClassifiedPoi>, ClassificationError> {
        let max_attempts = self.config.max_retries + 1;
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let mut violation: Option<String> = None;
        let mut last_failure = AttemptFailure::Format("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            let prompt = build_prompt(stops, context, violation.as_deref());

            let generated = tokio::time::timeout(timeout, self.generator.generate(&prompt))
                .await
                .unwrap_or_else(|_| {
                    Err(GenerationError::Transport(format!(
                        "no response within {}s",
                        timeout.as_secs()
                    )))
                });

            let text = match generated {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        model = %self.generator.model_name(),
                        "Text generation failed: {}",
                        e
                    );
                    last_failure = AttemptFailure::Generation(e);
                    continue;
                }
            };

            let records = match parse_response(&text, stops.len()) {
                Ok(records) => records,
                Err(reason) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "Classification response rejected: {}",
                        reason
                    );
                    violation = Some(reason.clone());
                    last_failure = AttemptFailure::Format(reason);
                    continue;
                }
            };

            match self.build_pois(stops, records, context) {
                Ok(pois) => {
                    tracing::info!(
                        stops = stops.len(),
                        attempt,
                        "Classified {} stops",
                        pois.len()
                    );
                    return Ok(pois);
                }
                Err(BuildFailure::Format(reason)) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "Classification response rejected: {}",
                        reason
                    );
                    violation = Some(reason.clone());
                    last_failure = AttemptFailure::Format(reason);
                }
                Err(BuildFailure::Fatal(e)) => {
                    tracing::error!("Classification rejected: {}", e);
                    return Err(e);
                }
            }
        }

        Err(match last_failure {
            AttemptFailure::Format(reason) => ClassificationError::Unparseable {
                attempts: max_attempts,
                reason,
            },
            AttemptFailure::Generation(source) => ClassificationError::Generation {
                attempts: max_attempts,
                source,
            },
        })
    }

    fn build_pois(
        &self,
        stops: &[Stop],
        mut records: BTreeMap<usize, RawClassification>,
        context: &TripContext,
    ) -> Result<Vec<ClassifiedPoi>, BuildFailure> {
        let date = context.window.local_date();
        let offset = context.window.offset();

        // Format checks first so a malformed record is retried rather than
        // reported as a hallucination.
        let mut parsed = Vec::with_capacity(stops.len());
        for stop in stops {
            let record = records.remove(&stop.index).ok_or_else(|| {
                BuildFailure::Format(format!("missing record for index {}", stop.index))
            })?;

            let category: PoiCategory = record.category.parse().map_err(|_| {
                BuildFailure::Format(format!(
                    "index {}: unknown category '{}'",
                    stop.index, record.category
                ))
            })?;

            let (window_start, window_end) = parse_local_range(&record.preferred_window)
                .map_err(|e| BuildFailure::Format(format!("index {}: {}", stop.index, e)))?;

            if record.stay_duration_minutes == Some(0) {
                return Err(BuildFailure::Format(format!(
                    "index {}: stay_duration_minutes must be positive",
                    stop.index
                )));
            }

            parsed.push((stop, record, category, window_start, window_end));
        }

        let mut pois = Vec::with_capacity(parsed.len());
        for (stop, record, category, window_start, window_end) in parsed {
            validate_coordinates(
                &stop.location,
                record.latitude,
                record.longitude,
                self.config.coordinate_tolerance_m,
            )
            .map_err(|mismatch| {
                BuildFailure::Fatal(ClassificationError::CoordinateHallucination {
                    index: stop.index,
                    name: stop.location.name.clone(),
                    mismatch,
                })
            })?;

            let (preferred_window_start, preferred_window_end) =
                resolve_local_range(date, offset, window_start, window_end);

            pois.push(ClassifiedPoi {
                index: stop.index,
                location: stop.location.clone(),
                category,
                preferred_window_start,
                preferred_window_end,
                rationale: record.rationale,
                stay_duration_minutes: record
                    .stay_duration_minutes
                    .unwrap_or(self.config.default_stay_minutes),
            });
        }

        Ok(pois)
    }
}

enum BuildFailure {
    Format(String),
    Fatal(ClassificationError),
}

fn build_prompt(stops: &[Stop], context: &TripContext, violation: Option<&str>) -> StructuredPrompt {
    let mut user = format!(
        "Trip date: {}\nTrip window: {:02}:{:02}-{:02}:{:02} (UTC offset {})\nStarting from: {}\nTravel mode: {}\n\nPlaces:\n",
        context.window.local_date(),
        context.window.start.hour(),
        context.window.start.minute(),
        context.window.end.hour(),
        context.window.end.minute(),
        context.window.offset(),
        context.start_name,
        context.mode,
    );

    for stop in stops {
        user.push_str(&format!(
            "- index: {}, name: \"{}\", address: \"{}\", latitude: {}, longitude: {}\n",
            stop.index,
            stop.location.name,
            stop.location.address,
            stop.location.latitude,
            stop.location.longitude
        ));
    }

    user.push_str(&format!(
        "\nReturn exactly {} records, one per index.",
        stops.len()
    ));

    if let Some(reason) = violation {
        user.push_str(&format!(
            "\n\nYour previous response was rejected: {}. Return STRICT JSON only, \
             with exactly one record per index and no extra fields.",
            reason
        ));
    }

    StructuredPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
        max_tokens: CLASSIFY_MAX_TOKENS,
    }
}

/// Pull the outermost JSON object out of a response that may be wrapped in
/// a markdown fence or surrounded by prose.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse and check record indices. Returns records keyed by index.
fn parse_response(
    text: &str,
    expected: usize,
) -> Result<BTreeMap<usize, RawClassification>, String> {
    let json = extract_json(text).ok_or_else(|| "response contains no JSON object".to_string())?;
    let response: RawClassificationResponse =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;

    let received = response.classifications.len();
    let mut records = BTreeMap::new();
    for record in response.classifications {
        let index = record.index;
        if index >= expected {
            return Err(format!("unexpected index {}", index));
        }
        if records.insert(index, record).is_some() {
            return Err(format!("duplicate index {}", index));
        }
    }

    if records.len() != expected {
        let missing: Vec<String> = (0..expected)
            .filter(|i| !records.contains_key(i))
            .map(|i| i.to_string())
            .collect();
        return Err(format!(
            "expected {} records, received {} (missing indices: {})",
            expected,
            received,
            missing.join(", ")
        ));
    }

    Ok(records)
}
