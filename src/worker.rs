use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::errors::{Result, SegError};
use crate::pipeline::SegmentationPipeline;
use crate::traits::SegmentationModel;

/// Where a request's image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Memory(DynamicImage),
}

impl ImageSource {
    fn load(self) -> Result<DynamicImage> {
        match self {
            Self::Path(path) => image::open(&path).map_err(|e| SegError::ImageProcessing {
                path: path.display().to_string(),
                operation: "image decode".to_string(),
                source: Box::new(e),
            }),
            Self::Memory(image) => Ok(image),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    pub id: u64,
    pub source: ImageSource,
}

impl SegmentationRequest {
    pub fn from_path(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            source: ImageSource::Path(path.into()),
        }
    }

    pub fn from_image(id: u64, image: DynamicImage) -> Self {
        Self {
            id,
            source: ImageSource::Memory(image),
        }
    }
}

/// What the worker reports back, in order, for every request.
///
/// A request yields `Original` followed by `Mask`, or ends in `Failed` (possibly after
/// its `Original` was already sent).
#[derive(Debug)]
pub enum PipelineEvent {
    Original { id: u64, image: RgbImage },
    Mask { id: u64, mask: RgbaImage },
    Failed { id: u64, error: SegError },
}

impl PipelineEvent {
    pub const fn id(&self) -> u64 {
        match self {
            Self::Original { id, .. } | Self::Mask { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    /// True for the last event of a request.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Mask { .. } | Self::Failed { .. })
    }
}

/// Runs a [`SegmentationPipeline`] on a dedicated thread.
///
/// Requests are handled strictly one after another; results only flow back through the
/// event channel.
pub struct PipelineWorker {
    requests: Sender<SegmentationRequest>,
    events: Receiver<PipelineEvent>,
    handle: JoinHandle<()>,
}

impl PipelineWorker {
    pub fn spawn<M>(pipeline: SegmentationPipeline<M>) -> Result<Self>
    where
        M: SegmentationModel + 'static,
    {
        let (request_tx, request_rx) = channel::unbounded::<SegmentationRequest>();
        let (event_tx, event_rx) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("segmentation".to_string())
            .spawn(move || worker_loop(&pipeline, &request_rx, &event_tx))
            .map_err(|source| SegError::WorkerSpawn { source })?;

        Ok(Self {
            requests: request_tx,
            events: event_rx,
            handle,
        })
    }

    pub fn submit(&self, request: SegmentationRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| SegError::PipelineClosed)
    }

    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Blocks until the next event arrives.
    pub fn next_event(&self) -> Result<PipelineEvent> {
        self.events.recv().map_err(|_| SegError::PipelineClosed)
    }

    /// Stops accepting requests, waits for the queued ones and returns their events.
    pub fn shutdown(self) -> Result<Vec<PipelineEvent>> {
        let Self {
            requests,
            events,
            handle,
        } = self;
        drop(requests);
        handle.join().map_err(|_| SegError::PipelineClosed)?;
        Ok(events.try_iter().collect())
    }
}

fn worker_loop<M: SegmentationModel>(
    pipeline: &SegmentationPipeline<M>,
    requests: &Receiver<SegmentationRequest>,
    events: &Sender<PipelineEvent>,
) {
    for SegmentationRequest { id, source } in requests.iter() {
        debug!(id, "segmentation request received");

        let outcome = source.load().and_then(|image| {
            pipeline.run(&image, |original| {
                let _ = events.send(PipelineEvent::Original {
                    id,
                    image: original.clone(),
                });
            })
        });

        let event = match outcome {
            Ok(output) => PipelineEvent::Mask {
                id,
                mask: output.mask,
            },
            Err(error) => {
                warn!(id, %error, "segmentation request failed");
                PipelineEvent::Failed { id, error }
            }
        };

        if events.send(event).is_err() {
            debug!("event receiver dropped, stopping worker");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmentationModel;
    use crate::pipeline::PipelineSettings;

    #[test]
    fn events_arrive_in_request_order() -> Result<()> {
        let pipeline = SegmentationPipeline::new(
            MockSegmentationModel::uniform(3, 2),
            PipelineSettings::default(),
        );
        let worker = PipelineWorker::spawn(pipeline)?;

        worker.submit(SegmentationRequest::from_image(
            7,
            DynamicImage::new_rgb8(40, 20),
        ))?;

        let first = worker.next_event()?;
        assert!(matches!(first, PipelineEvent::Original { id: 7, .. }));
        assert!(!first.is_terminal());

        let second = worker.next_event()?;
        match &second {
            PipelineEvent::Mask { id, mask } => {
                assert_eq!(*id, 7);
                assert_eq!(mask.dimensions(), (300, 150));
            }
            other => panic!("expected a mask, got {other:?}"),
        }
        assert!(second.is_terminal());

        assert!(worker.shutdown()?.is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_image_fails_without_original() -> Result<()> {
        let pipeline = SegmentationPipeline::new(
            MockSegmentationModel::uniform(3, 0),
            PipelineSettings::default(),
        );
        let worker = PipelineWorker::spawn(pipeline)?;
        worker.submit(SegmentationRequest::from_path(1, "does/not/exist.png"))?;

        let event = worker.next_event()?;
        assert_eq!(event.id(), 1);
        assert!(matches!(
            event,
            PipelineEvent::Failed {
                error: SegError::ImageProcessing { .. },
                ..
            }
        ));
        worker.shutdown()?;
        Ok(())
    }

    #[test]
    fn worker_survives_a_failed_request() -> Result<()> {
        let pipeline = SegmentationPipeline::new(
            MockSegmentationModel::uniform(2, 1),
            PipelineSettings::default(),
        );
        let worker = PipelineWorker::spawn(pipeline)?;
        worker.submit(SegmentationRequest::from_path(1, "missing.png"))?;
        worker.submit(SegmentationRequest::from_image(
            2,
            DynamicImage::new_rgb8(8, 8),
        ))?;

        let events = worker.shutdown()?;
        let ids: Vec<_> = events.iter().map(PipelineEvent::id).collect();
        assert_eq!(ids, vec![1, 2, 2]);
        assert!(matches!(events[2], PipelineEvent::Mask { .. }));
        Ok(())
    }
}
