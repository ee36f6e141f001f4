/// Compute collaborators on a worker thread.
///
/// Every [`ComputeRequest`] yields exactly one [`ComputeResponse`] carrying
/// the same id, even if the kernel panics. The UI thread polls responses
/// without blocking.

pub mod kernels;

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::data::peaks::Peak;
use crate::data::series::SampleSeries;
use crate::error::{Result, ViewError};

pub use kernels::{BuiltinKernels, Kernels, PickParams};

#[derive(Debug, Clone)]
pub enum ComputeJob {
    Fft { re: Vec<f64>, im: Vec<f64> },
    PickPeaks { series: SampleSeries, params: PickParams },
    EstimateBaseline { values: Vec<f64> },
}

impl ComputeJob {
    pub fn name(&self) -> &'static str {
        match self {
            ComputeJob::Fft { .. } => "fft",
            ComputeJob::PickPeaks { .. } => "pick-peaks",
            ComputeJob::EstimateBaseline { .. } => "estimate-baseline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeOutput {
    Spectrum { re: Vec<f64>, im: Vec<f64> },
    Peaks(Vec<Peak>),
    Baseline(Vec<f64>),
}

#[derive(Debug)]
pub struct ComputeRequest {
    pub id: u64,
    pub job: ComputeJob,
}

#[derive(Debug)]
pub struct ComputeResponse {
    pub id: u64,
    pub result: Result<ComputeOutput>,
}

fn run_job<K: Kernels>(kernels: &K, job: ComputeJob) -> Result<ComputeOutput> {
    match job {
        ComputeJob::Fft { re, im } => {
            let (re, im) = kernels.fft(&re, &im)?;
            Ok(ComputeOutput::Spectrum { re, im })
        }
        ComputeJob::PickPeaks { series, params } => {
            Ok(ComputeOutput::Peaks(kernels.pick_peaks(&series, params)?))
        }
        ComputeJob::EstimateBaseline { values } => {
            Ok(ComputeOutput::Baseline(kernels.estimate_baseline(&values)?))
        }
    }
}

fn worker_loop<K: Kernels>(kernels: K, requests: Receiver<ComputeRequest>, responses: Sender<ComputeResponse>) {
    for ComputeRequest { id, job } in requests {
        let name = job.name();
        let result = panic::catch_unwind(AssertUnwindSafe(|| run_job(&kernels, job)))
            .unwrap_or_else(|_| Err(ViewError::PreconditionFailed(format!("{} kernel panicked", name))));
        log::debug!("compute request {} ({}) done, ok={}", id, name, result.is_ok());
        if responses.send(ComputeResponse { id, result }).is_err() {
            log::warn!("compute response {} dropped: receiver gone", id);
            break;
        }
    }
}

/// Handle to the worker thread
pub struct ComputeService {
    requests: Option<Sender<ComputeRequest>>,
    responses: Receiver<ComputeResponse>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl ComputeService {
    pub fn spawn<K: Kernels>(kernels: K) -> Result<Self> {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("nmr-view-compute".into())
            .spawn(move || worker_loop(kernels, req_rx, resp_tx))?;
        Ok(Self {
            requests: Some(req_tx),
            responses: resp_rx,
            worker: Some(worker),
            next_id: 1,
        })
    }

    /// Queue a job; returns the id its response will carry
    pub fn submit(&mut self, job: ComputeJob) -> Result<u64> {
        let id = self.next_id;
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| ViewError::PreconditionFailed("compute service shut down".into()))?;
        sender
            .send(ComputeRequest { id, job })
            .map_err(|_| ViewError::PreconditionFailed("compute worker has exited".into()))?;
        self.next_id += 1;
        Ok(id)
    }

    /// Responses that have arrived so far
    pub fn poll(&self) -> Vec<ComputeResponse> {
        self.responses.try_iter().collect()
    }

    /// Block up to `timeout` for the next response
    pub fn wait(&self, timeout: Duration) -> Option<ComputeResponse> {
        self.responses.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("compute worker exited abnormally");
            }
        }
    }
}

impl Drop for ComputeService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicky;

    impl Kernels for Panicky {
        fn fft(&self, _re: &[f64], _im: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
            panic!("boom")
        }
        fn pick_peaks(&self, _series: &SampleSeries, _params: PickParams) -> Result<Vec<Peak>> {
            Ok(Vec::new())
        }
        fn estimate_baseline(&self, values: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![0.0; values.len()])
        }
    }

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn test_one_response_per_request_in_order() {
        let mut service = ComputeService::spawn(BuiltinKernels).unwrap();
        let a = service
            .submit(ComputeJob::EstimateBaseline { values: vec![1.0; 20] })
            .unwrap();
        let b = service
            .submit(ComputeJob::EstimateBaseline { values: Vec::new() })
            .unwrap();
        let first = service.wait(WAIT).unwrap();
        let second = service.wait(WAIT).unwrap();
        assert_eq!(first.id, a);
        assert_eq!(first.result.unwrap(), ComputeOutput::Baseline(vec![1.0; 20]));
        assert_eq!(second.id, b);
        assert!(matches!(second.result, Err(ViewError::EmptyInput(_))));
        assert!(service.poll().is_empty());
    }

    #[test]
    fn test_kernel_panic_still_answers() {
        let mut service = ComputeService::spawn(Panicky).unwrap();
        let id = service
            .submit(ComputeJob::Fft { re: vec![1.0], im: vec![0.0] })
            .unwrap();
        let resp = service.wait(WAIT).unwrap();
        assert_eq!(resp.id, id);
        assert!(matches!(resp.result, Err(ViewError::PreconditionFailed(_))));
        // worker survives
        service
            .submit(ComputeJob::EstimateBaseline { values: vec![2.0] })
            .unwrap();
        assert!(service.wait(WAIT).unwrap().result.is_ok());
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut service = ComputeService::spawn(BuiltinKernels).unwrap();
        service.shutdown();
        assert!(service
            .submit(ComputeJob::EstimateBaseline { values: vec![1.0] })
            .is_err());
    }
}
