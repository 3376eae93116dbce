use crate::model::{SegmentCategory, SegmentedDocument};

/// Fixed post-processing applied after rule-based segmentation for a known
/// document family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Profile {
    pub category_prefix: &'static str,
    pub guideline_prefix: &'static str,
    pub part_prefix: &'static str,
    /// Descriptions keyed by the category ID as it appears in the source.
    pub category_descriptions: &'static [(&'static str, &'static str)],
    pub document_type: &'static str,
    pub industry_sectors: &'static [&'static str],
    pub jurisdictions: &'static [&'static str],
}

pub(crate) const PCI_DSS_PROFILE: Profile = Profile {
    category_prefix: "REQ-",
    guideline_prefix: "PCI-DSS-",
    part_prefix: "PCI-DSS-",
    category_descriptions: &[
        ("1", "Build and Maintain a Secure Network"),
        ("2", "Build and Maintain a Secure Network"),
        ("3", "Protect Cardholder Data"),
        ("4", "Protect Cardholder Data"),
        ("5", "Maintain a Vulnerability Management Program"),
        ("6", "Maintain a Vulnerability Management Program"),
        ("7", "Implement Strong Access Control Measures"),
        ("8", "Implement Strong Access Control Measures"),
        ("9", "Implement Strong Access Control Measures"),
        ("10", "Regularly Monitor and Test Networks"),
        ("11", "Regularly Monitor and Test Networks"),
        ("12", "Maintain an Information Security Policy"),
    ],
    document_type: "Standard",
    industry_sectors: &["financial-services", "payment-processing"],
    jurisdictions: &[],
};

pub(crate) const NIST_800_53_PROFILE: Profile = Profile {
    category_prefix: "",
    guideline_prefix: "",
    part_prefix: "",
    category_descriptions: &[
        ("AC", "Access Control"),
        ("AT", "Awareness and Training"),
        ("AU", "Audit and Accountability"),
        ("CA", "Assessment, Authorization, and Monitoring"),
        ("CM", "Configuration Management"),
        ("CP", "Contingency Planning"),
        ("IA", "Identification and Authentication"),
        ("IR", "Incident Response"),
        ("MA", "Maintenance"),
        ("MP", "Media Protection"),
        ("PE", "Physical and Environmental Protection"),
        ("PL", "Planning"),
        ("PM", "Program Management"),
        ("PS", "Personnel Security"),
        ("PT", "PII Processing and Transparency"),
        ("RA", "Risk Assessment"),
        ("SA", "System and Services Acquisition"),
        ("SC", "System and Communications Protection"),
        ("SI", "System and Information Integrity"),
        ("SR", "Supply Chain Risk Management"),
    ],
    document_type: "Framework",
    industry_sectors: &["government"],
    jurisdictions: &["United States"],
};

impl Profile {
    pub(crate) fn apply(&self, doc: &mut SegmentedDocument) {
        let meta = &mut doc.document_metadata;
        meta.document_type = self.document_type.to_string();
        if !self.industry_sectors.is_empty() {
            meta.industry_sectors = to_strings(self.industry_sectors);
        }
        if !self.jurisdictions.is_empty() {
            meta.jurisdictions = to_strings(self.jurisdictions);
        }

        for category in &mut doc.categories {
            self.enrich_category(category);
        }
    }

    fn enrich_category(&self, category: &mut SegmentCategory) {
        if category.description.is_empty() {
            if let Some((_, description)) = self
                .category_descriptions
                .iter()
                .find(|(id, _)| *id == category.id)
            {
                category.description = description.to_string();
            }
        }

        with_prefix(&mut category.id, self.category_prefix);
        for guideline in &mut category.guidelines {
            with_prefix(&mut guideline.id, self.guideline_prefix);
            for part in &mut guideline.parts {
                with_prefix(&mut part.id, self.part_prefix);
            }
        }
    }
}

fn with_prefix(id: &mut String, prefix: &str) {
    if !prefix.is_empty() && !id.starts_with(prefix) {
        id.insert_str(0, prefix);
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
