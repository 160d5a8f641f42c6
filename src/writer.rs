//! Message writers.
//!
//! [`write_message`] walks a complete document: header, then each segment's
//! metadata and data, in table order. [`SegmentWriter`] streams an ephemeris
//! one segment at a time from a template metadata.

use crate::container::{Block, Commented};
use crate::error::{Error, Result};
use crate::generator::{generator, Generator};
use crate::header::Header;
use crate::message::{Message, MessageKind};
use crate::options::GeneratorOptions;
use crate::section::SectionName;
use crate::time::Epoch;
use tracing::debug;

/// Metadata carrying the time span of its segment.
pub trait TimeSpan {
    fn start_time(&self) -> Option<&Epoch>;

    fn set_start_time(&mut self, epoch: Epoch);

    fn set_stop_time(&mut self, epoch: Epoch);
}

/// Writes a complete message.
pub fn write_message<K: MessageKind>(generator: &mut dyn Generator, message: &Message<K>) -> Result<()> {
    debug!(
        output = generator.output_name(),
        syntax = generator.syntax().as_str(),
        message = K::NAME,
        "writing message"
    );
    start::<K>(generator, &message.header)?;
    for segment in &message.segments {
        write_segment::<K>(generator, &segment.metadata, &segment.data)?;
    }
    finish::<K>(generator)
}

fn start<K: MessageKind>(generator: &mut dyn Generator, header: &Header) -> Result<()> {
    let version = if header.format_version > 0.0 {
        header.format_version
    } else {
        K::DEFAULT_VERSION
    };
    generator.start_message(K::ROOT, K::VERSION_KEY, version)?;
    header.write(generator)?;
    generator.enter_section(SectionName::BODY)
}

fn finish<K: MessageKind>(generator: &mut dyn Generator) -> Result<()> {
    generator.exit_section()?;
    generator.end_message(K::ROOT)
}

fn write_segment<K: MessageKind>(
    generator: &mut dyn Generator,
    metadata: &K::Metadata,
    data: &K::Data,
) -> Result<()> {
    generator.enter_section(SectionName::SEGMENT)?;
    generator.enter_section(K::metadata_section())?;
    generator.write_comments(metadata.comments())?;
    K::write_metadata(generator, metadata)?;
    generator.exit_section()?;
    generator.write_empty_line()?;
    generator.enter_section(K::data_section())?;
    K::write_data(generator, metadata, data)?;
    generator.exit_section()?;
    generator.exit_section()
}

/// Writes one keyword block: its element (XML), its comments, then `fields`.
pub(crate) fn write_block<B: Block>(
    generator: &mut dyn Generator,
    block: &B,
    fields: impl FnOnce(&mut dyn Generator) -> Result<()>,
) -> Result<()> {
    generator.enter_section(SectionName::implicit(B::NAME))?;
    generator.write_comments(block.comments())?;
    fields(&mut *generator)?;
    generator.exit_section()?;
    generator.write_empty_line()
}

/// Streaming writer for multi-segment messages.
///
/// Every segment is written with a copy of the template metadata, updated
/// with the segment time span and any caller overrides. The template itself
/// never changes. Segment start times must not go backwards.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::odm::oem::{OemData, OemMetadata};
/// use ccsds_ndm::writer::SegmentWriter;
/// use ccsds_ndm::{Epoch, GeneratorOptions, Header, Oem};
///
/// let header = Header {
///     format_version: 3.0,
///     creation_date: Epoch::parse("2024-01-01T00:00:00"),
///     originator: Some("ESOC".to_string()),
///     ..Header::default()
/// };
/// let mut template = OemMetadata::default();
/// template.common.object_name = Some("SAT".to_string());
///
/// let mut writer = SegmentWriter::<Oem>::new(GeneratorOptions::kvn(), &header, template).unwrap();
/// let t0 = Epoch::parse("2024-01-01T00:00:00").unwrap();
/// let t1 = Epoch::parse("2024-01-01T01:00:00").unwrap();
/// let data = OemData::default();
/// # let fill = |m: &mut OemMetadata| {
/// #     m.common.object_id = Some("2024-001A".to_string());
/// #     m.common.center_name = Some("EARTH".to_string());
/// #     m.common.ref_frame = Some("EME2000".to_string());
/// #     m.common.time_system = Some(ccsds_ndm::time::TimeSystem::Utc);
/// # };
/// writer.write_segment_with(t1, t1, &data, fill).unwrap();
/// assert!(writer.write_segment_with(t0, t1, &data, fill).is_err());
/// assert!(writer.template().start_time.is_none());
/// ```
pub struct SegmentWriter<K: MessageKind>
where
    K::Metadata: TimeSpan,
{
    generator: Box<dyn Generator>,
    template: K::Metadata,
    cursor: Option<Epoch>,
    segments: usize,
    /// First error raised while a segment was half written.
    failure: Option<Error>,
}

impl<K: MessageKind> SegmentWriter<K>
where
    K::Metadata: TimeSpan,
{
    /// Starts the message and writes its header.
    pub fn new(options: GeneratorOptions, header: &Header, template: K::Metadata) -> Result<Self> {
        let mut generator = generator(options);
        start::<K>(generator.as_mut(), header)?;
        Ok(SegmentWriter {
            generator,
            template,
            cursor: None,
            segments: 0,
            failure: None,
        })
    }

    pub fn template(&self) -> &K::Metadata {
        &self.template
    }

    /// Writes a segment spanning `start` to `stop`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentOrder`] if `start` is earlier than the start
    /// of the previous segment, and generation errors from the segment itself.
    /// A segment that fails part-way leaves the output unusable: that error is
    /// returned again by every later call, including [`finish`](Self::finish).
    pub fn write_segment(&mut self, start: Epoch, stop: Epoch, data: &K::Data) -> Result<()> {
        self.write_segment_with(start, stop, data, |_| {})
    }

    /// Same as [`write_segment`](Self::write_segment), with additional
    /// changes applied to this segment's copy of the metadata.
    pub fn write_segment_with(
        &mut self,
        start: Epoch,
        stop: Epoch,
        data: &K::Data,
        overrides: impl FnOnce(&mut K::Metadata),
    ) -> Result<()> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if let Some(previous) = self.cursor {
            if start < previous {
                return Err(Error::segment_order(
                    self.generator.output_name(),
                    &previous.to_string(),
                    &start.to_string(),
                ));
            }
        }
        let mut metadata = self.template.clone();
        metadata.set_start_time(start);
        metadata.set_stop_time(stop);
        overrides(&mut metadata);

        if let Err(err) = write_segment::<K>(self.generator.as_mut(), &metadata, data) {
            debug!(output = self.generator.output_name(), error = %err, "segment failed");
            self.failure = Some(err.clone());
            return Err(err);
        }
        self.cursor = Some(start);
        self.segments += 1;
        debug!(
            output = self.generator.output_name(),
            segment = self.segments,
            start = %start,
            "segment written"
        );
        Ok(())
    }

    /// Closes the message and returns the generated text.
    pub fn finish(mut self) -> Result<String> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        finish::<K>(self.generator.as_mut())?;
        Ok(self.generator.into_output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odm::oem::{EphemerisState, OemData, OemMetadata};
    use crate::time::TimeSystem;
    use crate::Oem;

    fn epoch(text: &str) -> Epoch {
        Epoch::parse(text).unwrap()
    }

    fn writer() -> SegmentWriter<Oem> {
        let header = Header {
            creation_date: Some(epoch("2024-01-01T00:00:00")),
            originator: Some("ESOC".to_string()),
            ..Header::default()
        };
        let mut template = OemMetadata::default();
        template.common.object_name = Some("SAT".to_string());
        template.common.object_id = Some("2024-001A".to_string());
        template.common.center_name = Some("EARTH".to_string());
        template.common.ref_frame = Some("EME2000".to_string());
        template.common.time_system = Some(TimeSystem::Utc);
        SegmentWriter::new(GeneratorOptions::kvn().with_output_name("out.oem"), &header, template).unwrap()
    }

    fn data(x: f64) -> OemData {
        OemData {
            states: vec![EphemerisState {
                epoch: epoch("2024-01-01T00:00:00"),
                position: [x, 0.0, 0.0],
                velocity: [0.0, 7.5e3, 0.0],
                acceleration: None,
            }],
            ..OemData::default()
        }
    }

    #[test]
    fn test_segments_are_written_in_order() {
        let mut writer = writer();
        let (t0, t1) = (epoch("2024-01-01T00:00:00"), epoch("2024-01-01T01:00:00"));
        writer.write_segment(t0, t1, &data(7.0e6)).unwrap();
        writer.write_segment(t1, t1, &data(7.1e6)).unwrap();
        let text = writer.finish().unwrap();
        assert_eq!(text.matches("META_START").count(), 2);
        let parsed = crate::from_str::<Oem>(&text).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].data.states[0].position[0], 7.1e6);
    }

    #[test]
    fn test_out_of_order_segment_keeps_writer_usable() {
        let mut writer = writer();
        let (t0, t1) = (epoch("2024-01-01T00:00:00"), epoch("2024-01-01T01:00:00"));
        writer.write_segment(t1, t1, &data(7.0e6)).unwrap();
        assert!(matches!(
            writer.write_segment(t0, t1, &data(7.0e6)),
            Err(Error::SegmentOrder { .. })
        ));
        writer.write_segment(t1, t1, &data(7.0e6)).unwrap();
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn test_failed_segment_poisons_writer() {
        let mut writer = writer();
        let (t0, t1) = (epoch("2024-01-01T00:00:00"), epoch("2024-01-01T01:00:00"));
        let failure = writer.write_segment(t0, t1, &data(f64::NAN)).unwrap_err();
        assert!(matches!(failure, Error::Unwritable { .. }));

        assert_eq!(writer.write_segment(t1, t1, &data(7.0e6)), Err(failure.clone()));
        assert_eq!(writer.finish(), Err(failure));
    }
}
