use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One analysis step exposed by the remote service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Training,
    Correlation,
    Split,
    Preprocessing,
    Pipeline,
    Evaluation,
}

impl StageId {
    /// Chained-mode order.
    pub const ORDER: [StageId; 6] = [
        StageId::Training,
        StageId::Correlation,
        StageId::Split,
        StageId::Preprocessing,
        StageId::Pipeline,
        StageId::Evaluation,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            StageId::Training => "/api/logistic/arff/",
            StageId::Correlation => "/api/correlation/arff/",
            StageId::Split => "/api/split/arff/",
            StageId::Preprocessing => "/api/preprocessing/arff/",
            StageId::Pipeline => "/api/notebook09/pipeline/",
            StageId::Evaluation => "/api/notebook10/evaluation/",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            StageId::Training => "training",
            StageId::Correlation => "correlation",
            StageId::Split => "split",
            StageId::Preprocessing => "preprocessing",
            StageId::Pipeline => "pipeline",
            StageId::Evaluation => "evaluation",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StageId::Training => "Logistic regression",
            StageId::Correlation => "Correlation",
            StageId::Split => "Dataset split",
            StageId::Preprocessing => "Preprocessing",
            StageId::Pipeline => "Full pipeline",
            StageId::Evaluation => "Evaluation",
        }
    }

    pub fn index(self) -> usize {
        match self {
            StageId::Training => 0,
            StageId::Correlation => 1,
            StageId::Split => 2,
            StageId::Preprocessing => 3,
            StageId::Pipeline => 4,
            StageId::Evaluation => 5,
        }
    }

    /// Chart slots fed by this stage's result.
    pub fn slots(self) -> &'static [ChartSlot] {
        match self {
            StageId::Correlation => &[ChartSlot::CorrHeatmap, ChartSlot::Scatter],
            StageId::Split => &[
                ChartSlot::SplitTrain,
                ChartSlot::SplitVal,
                ChartSlot::SplitTest,
                ChartSlot::SplitSizes,
            ],
            StageId::Evaluation => &[ChartSlot::Confusion],
            StageId::Training | StageId::Preprocessing | StageId::Pipeline => &[],
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ORDER
            .into_iter()
            .find(|stage| stage.key() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Fixed rendering target hosting at most one live chart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChartSlot {
    CorrHeatmap,
    Scatter,
    SplitTrain,
    SplitVal,
    SplitTest,
    SplitSizes,
    Confusion,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 7] = [
        ChartSlot::CorrHeatmap,
        ChartSlot::Scatter,
        ChartSlot::SplitTrain,
        ChartSlot::SplitVal,
        ChartSlot::SplitTest,
        ChartSlot::SplitSizes,
        ChartSlot::Confusion,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ChartSlot::CorrHeatmap => "corrHeatmap",
            ChartSlot::Scatter => "scatterChart",
            ChartSlot::SplitTrain => "splitTrainChart",
            ChartSlot::SplitVal => "splitValChart",
            ChartSlot::SplitTest => "splitTestChart",
            ChartSlot::SplitSizes => "splitSizesChart",
            ChartSlot::Confusion => "confusionChart",
        }
    }

    pub fn stage(self) -> StageId {
        match self {
            ChartSlot::CorrHeatmap | ChartSlot::Scatter => StageId::Correlation,
            ChartSlot::SplitTrain
            | ChartSlot::SplitVal
            | ChartSlot::SplitTest
            | ChartSlot::SplitSizes => StageId::Split,
            ChartSlot::Confusion => StageId::Evaluation,
        }
    }
}

impl fmt::Display for ChartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// User-triggerable action; keys the loading flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionId {
    Stage(StageId),
    RunAll,
}

impl ActionId {
    pub fn label(self) -> &'static str {
        match self {
            ActionId::Stage(stage) => stage.title(),
            ActionId::RunAll => "Run all stages",
        }
    }
}
