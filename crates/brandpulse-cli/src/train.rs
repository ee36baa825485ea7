//! `train` and `evaluate` command handlers.

use std::io::Write;
use std::path::Path;

use brandpulse_core::{AppConfig, Sentiment};
use brandpulse_sentiment::{
    evaluate, read_corpus_as, split_holdout, Classifier, CorpusFormat, Evaluation, FeatureConfig,
    NaiveBayesModel, TrainOptions, TARGET_ACCURACY,
};

/// Train on the corpus minus a deterministic holdout, report holdout
/// accuracy, and save the model.
///
/// # Errors
///
/// Returns an error if the corpus cannot be read, has no usable examples
/// after the split, or the model cannot be written.
pub(crate) fn run_train(
    config: &AppConfig,
    corpus: &Path,
    format: CorpusFormat,
    model_path: &Path,
    alpha: f64,
    no_bigrams: bool,
) -> anyhow::Result<()> {
    let ingested = read_corpus_as(corpus, format)?;
    let total = ingested.records.len();
    let (train, holdout) = split_holdout(ingested.records, config.holdout_ratio);
    tracing::info!(
        corpus = %corpus.display(),
        %format,
        total,
        train = train.len(),
        holdout = holdout.len(),
        malformed = ingested.malformed,
        "loaded training corpus"
    );

    let options = TrainOptions {
        alpha,
        features: FeatureConfig {
            bigrams: !no_bigrams,
            ..FeatureConfig::default()
        },
    };
    let model = NaiveBayesModel::train(&train, options)?;

    if holdout.is_empty() {
        println!("holdout is empty; skipping evaluation");
    } else {
        let evaluation = evaluate(&model, &holdout);
        write_evaluation(&mut std::io::stdout().lock(), &evaluation)?;
    }

    model.save(model_path)?;
    println!(
        "saved model {} ({} terms) to {}",
        model.version(),
        model.vocabulary_size(),
        model_path.display()
    );
    Ok(())
}

/// Evaluate a saved model on every example in the corpus.
///
/// # Errors
///
/// Returns an error if the model is missing or invalid, or the corpus cannot
/// be read.
pub(crate) fn run_evaluate(
    corpus: &Path,
    format: CorpusFormat,
    model_path: &Path,
) -> anyhow::Result<()> {
    let model = NaiveBayesModel::load(model_path)?;
    let ingested = read_corpus_as(corpus, format)?;
    if ingested.records.is_empty() {
        println!("no usable examples in {}", corpus.display());
        return Ok(());
    }

    println!("model {}", model.version());
    let evaluation = evaluate(&model, &ingested.records);
    write_evaluation(&mut std::io::stdout().lock(), &evaluation)?;
    Ok(())
}

/// Render an evaluation as a small table.
pub(crate) fn write_evaluation(out: &mut dyn Write, evaluation: &Evaluation) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<10}{:>11}{:>9}{:>9}{:>9}",
        "CLASS", "PRECISION", "RECALL", "F1", "SUPPORT"
    )?;
    for sentiment in Sentiment::ALL {
        let m = evaluation
            .per_class
            .get(&sentiment)
            .copied()
            .unwrap_or_default();
        writeln!(
            out,
            "{:<10}{:>11.3}{:>9.3}{:>9.3}{:>9}",
            sentiment.as_str(),
            m.precision,
            m.recall,
            m.f1,
            m.support
        )?;
    }
    writeln!(
        out,
        "accuracy {:.3} ({}/{}), macro f1 {:.3}",
        evaluation.accuracy,
        evaluation.correct,
        evaluation.total,
        evaluation.macro_f1()
    )?;
    if !evaluation.meets_target() {
        writeln!(out, "below target accuracy of {TARGET_ACCURACY:.2}")?;
    }
    Ok(())
}
