use crate::error::LimsResult;
use crate::models::fields::apply_field_values;
use crate::models::{
    Analysis, Attachment, Contact, Content, FieldValues, RequestContext, Sample, Uid,
};
use crate::portal::ContentStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Content store keeping everything in memory. Permanent ids follow the
/// usual id server formats: `W-0001` for samples, `{source}-R01` for
/// retests and `{parent}-P01` for partitions.
#[derive(Debug)]
pub struct InMemoryContentStore {
    samples: DashMap<Uid, Sample>,
    contacts: DashMap<Uid, Contact>,
    attachments: DashMap<Uid, Attachment>,
    temporary_prefix: String,
    sample_counter: AtomicUsize,
    derived_counter: AtomicUsize,
    attachment_counter: AtomicUsize,
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            samples: DashMap::new(),
            contacts: DashMap::new(),
            attachments: DashMap::new(),
            temporary_prefix: "tmp".to_string(),
            sample_counter: AtomicUsize::new(0),
            derived_counter: AtomicUsize::new(0),
            attachment_counter: AtomicUsize::new(0),
        }
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.insert(contact.uid.clone(), contact);
    }

    /// Store a sample as-is, bypassing creation
    pub fn insert_sample(&self, sample: Sample) {
        self.samples.insert(sample.uid().clone(), sample);
    }

    pub fn sample(&self, uid: &Uid) -> Option<Sample> {
        self.samples.get(uid).map(|entry| entry.value().clone())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn attachment(&self, uid: &Uid) -> Option<Attachment> {
        self.attachments.get(uid).map(|entry| entry.value().clone())
    }

    fn stored_id(&self, uid: Option<Uid>) -> Option<String> {
        uid.and_then(|uid| self.samples.get(&uid).map(|entry| entry.id().to_string()))
    }

    fn next_id(&self, sample: &Sample) -> String {
        if let Some(source) = self.stored_id(sample.invalidated_uid()) {
            let n = self.derived_counter.fetch_add(1, Ordering::SeqCst) + 1;
            return format!("{source}-R{n:02}");
        }
        if sample.is_partition() {
            if let Some(parent) = self.stored_id(sample.parent_uid()) {
                let n = self.derived_counter.fetch_add(1, Ordering::SeqCst) + 1;
                return format!("{parent}-P{n:02}");
            }
        }
        let n = self.sample_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("W-{n:04}")
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn create_sample(&self, container: &Uid, temporary_id: &str) -> LimsResult<Sample> {
        let sample = Sample::new(Uid::generate(), temporary_id, container);
        self.samples.insert(sample.uid().clone(), sample.clone());
        Ok(sample)
    }

    async fn create_analysis(&self, _sample: &Sample, id: &str) -> LimsResult<Analysis> {
        Ok(Analysis::new(Uid::generate(), id))
    }

    async fn process_form(
        &self,
        sample: &mut Sample,
        _request: &RequestContext,
        values: &FieldValues,
    ) -> LimsResult<()> {
        apply_field_values(sample, values);
        if sample.id().starts_with(&self.temporary_prefix) {
            self.assign_permanent_id(sample).await?;
        } else {
            self.samples.insert(sample.uid().clone(), sample.clone());
        }
        Ok(())
    }

    async fn assign_permanent_id(&self, sample: &mut Sample) -> LimsResult<String> {
        let id = self.next_id(sample);
        sample.set_id(id.clone());
        self.samples.insert(sample.uid().clone(), sample.clone());
        Ok(id)
    }

    async fn get_sample(&self, uid: &Uid) -> LimsResult<Option<Sample>> {
        Ok(self.sample(uid))
    }

    async fn save_sample(&self, sample: &Sample) -> LimsResult<()> {
        self.samples.insert(sample.uid().clone(), sample.clone());
        Ok(())
    }

    async fn get_contact(&self, uid: &Uid) -> LimsResult<Option<Contact>> {
        Ok(self.contacts.get(uid).map(|entry| entry.value().clone()))
    }

    async fn create_attachment(
        &self,
        _container: &Uid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> LimsResult<Attachment> {
        let n = self.attachment_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let attachment = Attachment {
            uid: Uid::generate(),
            id: format!("attachment-{n}"),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
        };
        self.attachments
            .insert(attachment.uid.clone(), attachment.clone());
        Ok(attachment)
    }
}
