use super::test_helpers::*;
use super::*;
use crate::db::TrackRecord;
use crate::types::{DownloadRequest, JobStatus, SkipReason, Stage, SubmissionStatus};
