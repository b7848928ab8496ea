use crate::model::{
    fs::Visibility,
    oss::{ACL_PRIVATE, ACL_PUBLIC_READ, ACL_PUBLIC_READ_WRITE},
};

/// Maps the two-valued `Visibility` onto OSS canned ACLs and back.
///
/// The mapping is lossy: `public-read-write` reads back as public, which is written as
/// `public-read`, and unrecognized ACLs fall back to the configured default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortableVisibilityConverter {
    default: Visibility,
}

impl PortableVisibilityConverter {
    pub fn new(default: Visibility) -> Self {
        Self { default }
    }

    pub fn default_visibility(&self) -> Visibility {
        self.default
    }

    pub fn visibility_to_acl(&self, visibility: Visibility) -> &'static str {
        match visibility {
            Visibility::Public => ACL_PUBLIC_READ,
            Visibility::Private => ACL_PRIVATE,
        }
    }

    pub fn acl_to_visibility(&self, acl: &str) -> Visibility {
        match acl {
            ACL_PRIVATE => Visibility::Private,
            ACL_PUBLIC_READ | ACL_PUBLIC_READ_WRITE => Visibility::Public,
            _ => self.default,
        }
    }
}

impl Default for PortableVisibilityConverter {
    fn default() -> Self {
        Self::new(Visibility::Public)
    }
}
