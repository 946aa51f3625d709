//! Batch cleaning workflow
//!
//! The pipeline runs these steps over one batch of records:
//! 1. Parse and standardize names
//! 2. Enrich company, job title and email-derived names
//! 3. Score quality
//! 4. Detect and merge duplicates, for as many passes as configured
//! 5. Rescore the merged output

use serde::{Deserialize, Serialize};

use crate::config::DedupSettings;
use crate::detector::{DetectionResult, DetectorStats, DuplicateDetector};
use crate::enrichment::{EnrichmentStats, RecordEnricher};
use crate::errors::{AppError, ResultExt};
use crate::lookups::LookupService;
use crate::merger::{DuplicateMerger, MergerStats};
use crate::models::{AuditEntry, ContactRecord, MatchCandidate};
use crate::name_parser::{NameParser, ParserStats};
use crate::scoring::QualityScorer;

/// Counters for a whole pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub input_records: usize,
    pub output_records: usize,
    pub passes_run: usize,
    pub parser: ParserStats,
    pub enrichment: EnrichmentStats,
    pub detector: DetectorStats,
    pub merger: MergerStats,
}

/// Result of [`DeduplicationEngine::deduplicate`]
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub records: Vec<ContactRecord>,
    /// Candidates of the first pass; their indices refer to the input batch
    pub candidates: Vec<MatchCandidate>,
    /// Every merge of every pass, tagged with its pass number
    pub audit: Vec<AuditEntry>,
    pub detector_stats: DetectorStats,
    pub merger_stats: MergerStats,
    pub passes_run: usize,
}

/// Detection plus merging, repeated while candidates remain
pub struct DeduplicationEngine {
    settings: DedupSettings,
    detector: DuplicateDetector,
}

impl DeduplicationEngine {
    pub fn new(settings: DedupSettings) -> Result<Self, AppError> {
        let thresholds = settings.thresholds()?;
        if settings.aggressive_mode {
            tracing::info!("Aggressive mode: thresholds lowered to {:?}", thresholds);
        }
        let detector = DuplicateDetector::new(thresholds)?;
        Ok(Self { settings, detector })
    }

    pub fn settings(&self) -> &DedupSettings {
        &self.settings
    }

    pub fn detect(&self, records: &[ContactRecord]) -> DetectionResult {
        self.detector.find_duplicates(records)
    }

    /// Runs up to `passes` rounds of detect + merge.
    ///
    /// Each round works on the previous round's output, so audit indices of
    /// pass `n > 1` refer to the records produced by pass `n - 1`.
    pub fn deduplicate(&self, records: &[ContactRecord]) -> Result<DedupOutcome, AppError> {
        let mut outcome = DedupOutcome {
            records: records.to_vec(),
            merger_stats: MergerStats {
                records_in: records.len(),
                records_out: records.len(),
                passed_through: records.len(),
                ..MergerStats::default()
            },
            ..DedupOutcome::default()
        };

        for pass in 1..=self.settings.passes {
            let detection = self.detect(&outcome.records);
            add_detector_stats(&mut outcome.detector_stats, &detection.stats);

            if pass == 1 {
                outcome.candidates = detection.candidates.clone();
            }

            if detection.candidates.is_empty() {
                tracing::info!("Pass {}: no candidates left", pass);
                break;
            }

            let merger = DuplicateMerger::new(self.settings.merge_policy).for_pass(pass);
            let (merged, stats) = merger
                .merge_groups(&outcome.records, &detection.candidates)
                .with_context(|| format!("merge pass {}", pass))?;

            if pass == 1 {
                outcome.merger_stats = stats;
            } else {
                outcome.merger_stats.absorb(&stats);
            }
            outcome.audit.extend(merged.audit);
            outcome.records = merged.records;
            outcome.passes_run = pass;
        }

        Ok(outcome)
    }
}

fn add_detector_stats(total: &mut DetectorStats, pass: &DetectorStats) {
    if total.records_compared == 0 {
        total.records_compared = pass.records_compared;
    }
    total.pairs_compared += pass.pairs_compared;
    total.email_matches += pass.email_matches;
    total.phone_matches += pass.phone_matches;
    total.name_matches += pass.name_matches;
    total.potential_duplicates += pass.potential_duplicates;
}

/// Output of a full cleaning run
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    pub records: Vec<ContactRecord>,
    pub candidates: Vec<MatchCandidate>,
    pub audit: Vec<AuditEntry>,
    pub stats: PipelineStats,
}

/// Full cleaning pipeline bound to the lookup tables
pub struct CleaningPipeline<'a, L: LookupService + ?Sized> {
    lookups: &'a L,
    engine: DeduplicationEngine,
}

impl<'a, L: LookupService + ?Sized> CleaningPipeline<'a, L> {
    pub fn new(lookups: &'a L, settings: DedupSettings) -> Result<Self, AppError> {
        Ok(Self {
            lookups,
            engine: DeduplicationEngine::new(settings)?,
        })
    }

    pub fn run(&self, records: &[ContactRecord]) -> Result<PipelineRun, AppError> {
        tracing::info!("Starting cleaning run for {} records", records.len());

        // Step 1: Names
        tracing::info!("Step 1: Parsing names");
        let (parsed, parser_stats) = NameParser::new(self.lookups)
            .parse_records(records, self.engine.settings().merge_compound_names);

        // Step 2: Enrichment
        tracing::info!("Step 2: Enriching records");
        let (enriched, enrichment_stats) = RecordEnricher::new(self.lookups).enrich_records(&parsed);

        // Step 3: Scoring
        tracing::info!("Step 3: Scoring quality");
        let scored = QualityScorer::score_records(&enriched);

        // Step 4: Deduplication
        tracing::info!(
            "Step 4: Deduplicating ({} policy, up to {} passes)",
            self.engine.settings().merge_policy.as_str(),
            self.engine.settings().passes
        );
        let dedup = self.engine.deduplicate(&scored)?;

        // Step 5: Rescore
        tracing::info!("Step 5: Rescoring {} output records", dedup.records.len());
        let final_records = QualityScorer::score_records(&dedup.records);

        let stats = PipelineStats {
            input_records: records.len(),
            output_records: final_records.len(),
            passes_run: dedup.passes_run,
            parser: parser_stats,
            enrichment: enrichment_stats,
            detector: dedup.detector_stats,
            merger: dedup.merger_stats,
        };

        tracing::info!(
            "Cleaning run finished: {} records in, {} out, {} merges",
            stats.input_records,
            stats.output_records,
            stats.merger.merges
        );

        Ok(PipelineRun {
            records: final_records,
            candidates: dedup.candidates,
            audit: dedup.audit,
            stats,
        })
    }
}
