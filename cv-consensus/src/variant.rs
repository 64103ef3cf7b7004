use crate::{
    ArrsacConsensus, ConsensusError, Estimator, ExhaustiveSampler, InlierSupport, Lmeds, Mle,
    ParseRansacTypeError, RandomSampler, RansacParameters, RansacSummary,
    SampleConsensusEstimator,
};
use core::{fmt, str::FromStr};
use log::debug;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A consensus search bound to one [`Estimator`], ready to be run on any number of inputs.
pub trait Consensus<E: Estimator> {
    /// Searches `data` for the model with the best consensus.
    ///
    /// Each call is independent of previous calls on the same instance.
    fn estimate(&mut self, data: &[E::Datum]) -> Result<(E::Model, RansacSummary), ConsensusError>;

    /// The parameters this search was configured with.
    fn parameters(&self) -> &RansacParameters;
}

/// Which sample consensus variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum RansacType {
    /// Random sampling with an adaptive iteration bound.
    #[default]
    Ransac,
    /// Least median of squares.
    Lmeds,
    /// Every minimal sample in lexicographic order.
    Exhaustive,
    /// Adaptive real-time random sample consensus from the `arrsac` crate.
    Arrsac,
}

impl RansacType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ransac => "ransac",
            Self::Lmeds => "lmeds",
            Self::Exhaustive => "exhaustive",
            Self::Arrsac => "arrsac",
        }
    }
}

impl fmt::Display for RansacType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RansacType {
    type Err = ParseRansacTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ransac" => Ok(Self::Ransac),
            "lmeds" | "lmed" => Ok(Self::Lmeds),
            "exhaustive" => Ok(Self::Exhaustive),
            "arrsac" => Ok(Self::Arrsac),
            _ => Err(ParseRansacTypeError(s.to_owned())),
        }
    }
}

/// Builds the consensus search selected by `ransac_type` around `estimator`.
///
/// [`RansacParameters::use_mle`] switches RANSAC and exhaustive search to truncated scoring.
/// LMedS always scores with the median and ARRSAC always uses its own scoring.
/// The returned search can be moved to another thread, but runs on one thread at a time.
pub fn create_and_initialize_ransac_variant<E>(
    ransac_type: RansacType,
    params: RansacParameters,
    estimator: E,
) -> Box<dyn Consensus<E> + Send>
where
    E: Estimator + Send + 'static,
    E::Datum: Send,
    E::Model: Send,
{
    debug!("creating {} consensus with {:?}", ransac_type, params);
    let error_thresh = params.error_thresh;
    match ransac_type {
        RansacType::Ransac => {
            let sampler = RandomSampler::new(params.seed);
            if params.use_mle {
                Box::new(SampleConsensusEstimator::new(
                    params,
                    estimator,
                    sampler,
                    Mle::new(error_thresh),
                ))
            } else {
                Box::new(SampleConsensusEstimator::new(
                    params,
                    estimator,
                    sampler,
                    InlierSupport::new(error_thresh),
                ))
            }
        }
        RansacType::Lmeds => {
            let sampler = RandomSampler::new(params.seed);
            Box::new(SampleConsensusEstimator::new(
                params,
                estimator,
                sampler,
                Lmeds::new(E::SAMPLE_SIZE),
            ))
        }
        RansacType::Exhaustive => {
            if params.use_mle {
                Box::new(SampleConsensusEstimator::new(
                    params,
                    estimator,
                    ExhaustiveSampler::new(),
                    Mle::new(error_thresh),
                ))
            } else {
                Box::new(SampleConsensusEstimator::new(
                    params,
                    estimator,
                    ExhaustiveSampler::new(),
                    InlierSupport::new(error_thresh),
                ))
            }
        }
        RansacType::Arrsac => Box::new(ArrsacConsensus::new(params, estimator)),
    }
}
