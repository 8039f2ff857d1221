use crate::extract::fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact details found on a company site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainContacts {
    #[serde(default, deserialize_with = "fields::string_list")]
    pub email: Vec<String>,
    #[serde(default, deserialize_with = "fields::string_list")]
    pub phone: Vec<String>,
    #[serde(default, deserialize_with = "fields::string_list")]
    pub address: Vec<String>,
    #[serde(default, deserialize_with = "fields::string")]
    pub contact_page: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    #[serde(default, deserialize_with = "fields::string")]
    pub linkedin: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub instagram: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub twitter: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub facebook: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub youtube: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub tiktok: String,
}

impl SocialMedia {
    fn slots_mut(&mut self) -> [&mut String; 6] {
        [
            &mut self.linkedin,
            &mut self.instagram,
            &mut self.twitter,
            &mut self.facebook,
            &mut self.youtube,
            &mut self.tiktok,
        ]
    }

    fn values(&self) -> [&str; 6] {
        [
            self.linkedin.as_str(),
            self.instagram.as_str(),
            self.twitter.as_str(),
            self.facebook.as_str(),
            self.youtube.as_str(),
            self.tiktok.as_str(),
        ]
    }

    /// (platform, url) pairs that are set
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        ["linkedin", "instagram", "twitter", "facebook", "youtube", "tiktok"]
            .into_iter()
            .zip(self.values())
            .filter(|(_, url)| !url.is_empty())
            .collect()
    }
}

/// Partial profile extracted from one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFragment {
    #[serde(default, deserialize_with = "fields::string")]
    pub company: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub description: String,
    #[serde(default, deserialize_with = "fields::string_list")]
    pub smykm_notes: Vec<String>,
    #[serde(default, deserialize_with = "fields::null_default")]
    pub main_contacts: MainContacts,
    #[serde(default, deserialize_with = "fields::null_default")]
    pub social_media: SocialMedia,
}

/// Merged company profile for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub domain: String,
    pub company: String,
    pub description: String,
    /// Research notes, deduplicated in first-seen order
    pub smykm_notes: Vec<String>,
    pub main_contacts: MainContacts,
    pub social_media: SocialMedia,
    pub extracted_at: DateTime<Utc>,
    /// Stored pages read for the run
    pub crawled_pages: usize,
    pub chunks_processed: usize,
    #[serde(default)]
    pub chunks_failed: usize,
}

impl CompanyProfile {
    /// An empty profile for a domain
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            company: String::new(),
            description: String::new(),
            smykm_notes: Vec::new(),
            main_contacts: MainContacts::default(),
            social_media: SocialMedia::default(),
            extracted_at: Utc::now(),
            crawled_pages: 0,
            chunks_processed: 0,
            chunks_failed: 0,
        }
    }

    /// Returns true if the merge found no company data at all
    pub fn is_blank(&self) -> bool {
        self.company.is_empty()
            && self.description.is_empty()
            && self.smykm_notes.is_empty()
            && self.main_contacts == MainContacts::default()
            && self.social_media == SocialMedia::default()
    }
}

/// Merges partial profiles into one
///
/// Company name and description keep the longest value. Notes, emails,
/// phones and addresses are unioned by exact value in first-seen order.
/// The contact page and each social link keep the first non-empty value.
pub fn merge_profiles(domain: &str, fragments: &[ProfileFragment]) -> CompanyProfile {
    let mut merged = CompanyProfile::empty(domain);

    for fragment in fragments {
        if fragment.company.chars().count() > merged.company.chars().count() {
            merged.company = fragment.company.clone();
        }
        if fragment.description.chars().count() > merged.description.chars().count() {
            merged.description = fragment.description.clone();
        }

        union_into(&mut merged.smykm_notes, &fragment.smykm_notes);

        let contacts = &fragment.main_contacts;
        union_into(&mut merged.main_contacts.email, &contacts.email);
        union_into(&mut merged.main_contacts.phone, &contacts.phone);
        union_into(&mut merged.main_contacts.address, &contacts.address);
        if merged.main_contacts.contact_page.is_empty() {
            merged.main_contacts.contact_page = contacts.contact_page.clone();
        }

        for (slot, value) in merged
            .social_media
            .slots_mut()
            .into_iter()
            .zip(fragment.social_media.values())
        {
            if slot.is_empty() && !value.is_empty() {
                *slot = value.to_string();
            }
        }
    }

    merged
}

fn union_into(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !value.is_empty() && !target.contains(value) {
            target.push(value.clone());
        }
    }
}
