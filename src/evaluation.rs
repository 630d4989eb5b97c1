use std::{collections::BTreeMap, fmt::Display, iter::zip};

/// Tag-wise performance values.
#[derive(Debug, Default)]
struct LabelMeasure {
    /// Number of correct predictions.
    num_correct: usize,
    /** Number of occurrences of the tag in the gold-standard data. */
    num_observation: usize,
    /** Number of predictions. */
    num_prediction: usize,
    /** Precision. */
    precision: f64,
    /** Recall. */
    recall: f64,
    /** F1 score. */
    fmeasure: f64,
}

/// Overall tagging performance against a gold-standard corpus.
#[derive(Debug, Default)]
pub struct Evaluation {
    /** Number of tags seen in the gold-standard data. */
    pub num_labels: usize,
    /** Tag-wise evaluations. */
    tbl: BTreeMap<String, LabelMeasure>,

    /** Number of correctly tagged words. */
    item_total_correct: usize,
    /** Total number of words. */
    item_total_num: usize,
    /** Word-level accuracy. */
    item_accuracy: f64,

    /** Number of sentences tagged without error. */
    inst_total_correct: usize,
    /** Total number of sentences. */
    inst_total_num: usize,
    /** Sentence-level accuracy. */
    inst_accuracy: f64,

    /** Macro-averaged precision. */
    macro_precision: f64,
    /** Macro-averaged recall. */
    macro_recall: f64,
    /** Macro-averaged F1 score. */
    macro_fmeasure: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimation {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl Evaluation {
    /// Adds one sentence of gold tags and the tags chosen for it.
    pub fn accumulate(&mut self, reference: &[&str], prediction: &[&str]) {
        let mut matched = 0;
        for (&r, &p) in zip(reference, prediction) {
            self.tbl.entry(r.to_string()).or_default().num_observation += 1;
            self.tbl.entry(p.to_string()).or_default().num_prediction += 1;
            if r == p {
                self.tbl.entry(r.to_string()).or_default().num_correct += 1;
                matched += 1;
            }
            self.item_total_num += 1;
        }
        self.item_total_correct += matched;

        if matched == reference.len() && reference.len() == prediction.len() {
            self.inst_total_correct += 1;
        }
        self.inst_total_num += 1;
    }

    pub fn evaluate(&mut self) -> Estimation {
        self.num_labels = 0;
        self.macro_precision = 0.0;
        self.macro_recall = 0.0;
        self.macro_fmeasure = 0.0;
        for lev in self.tbl.values_mut() {
            lev.precision = 0.0;
            lev.recall = 0.0;
            lev.fmeasure = 0.0;
            if lev.num_observation == 0 {
                continue;
            }
            self.num_labels += 1;

            if lev.num_prediction > 0 {
                lev.precision = lev.num_correct as f64 / lev.num_prediction as f64;
            }
            lev.recall = lev.num_correct as f64 / lev.num_observation as f64;
            if lev.precision + lev.recall > 0.0 {
                lev.fmeasure = lev.precision * lev.recall * 2.0 / (lev.precision + lev.recall);
            }
            self.macro_precision += lev.precision;
            self.macro_recall += lev.recall;
            self.macro_fmeasure += lev.fmeasure;
        }

        if self.num_labels > 0 {
            self.macro_precision /= self.num_labels as f64;
            self.macro_recall /= self.num_labels as f64;
            self.macro_fmeasure /= self.num_labels as f64;
        }
        if self.item_total_num > 0 {
            self.item_accuracy = self.item_total_correct as f64 / self.item_total_num as f64;
        }
        if self.inst_total_num > 0 {
            self.inst_accuracy = self.inst_total_correct as f64 / self.inst_total_num as f64;
        }
        Estimation {
            accuracy: self.item_accuracy,
            precision: self.macro_precision,
            recall: self.macro_recall,
            fmeasure: self.macro_fmeasure,
        }
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance by tag (#match, #model, #ref) (precision, recall, F1):")?;
        for (label, lev) in &self.tbl {
            if lev.num_observation == 0 {
                writeln!(f, "\t{}: ({}, {}, {}) (******, ******, ******)", label, lev.num_correct, lev.num_prediction, lev.num_observation)?;
            } else {
                writeln!(
                    f,
                    "\t{}: ({}, {}, {}) ({:.4}, {:.4}, {:.4})",
                    label, lev.num_correct, lev.num_prediction, lev.num_observation, lev.precision, lev.recall, lev.fmeasure
                )?;
            }
        }
        writeln!(f, "Macro-average precision, recall, F1: ({:.4}, {:.4}, {:.4})", self.macro_precision, self.macro_recall, self.macro_fmeasure)?;
        writeln!(f, "Word accuracy: {}/{} => {:.4}", self.item_total_correct, self.item_total_num, self.item_accuracy)?;
        writeln!(f, "Sentence accuracy: {}/{} => {:.4}", self.inst_total_correct, self.inst_total_num, self.inst_accuracy)
    }
}
