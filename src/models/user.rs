//! Lab member accounts, roles and ranks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Platforms a member may link from their profile.
pub const SOCIAL_PLATFORMS: [&str; 4] = ["linkedin", "github", "twitter", "facebook"];

/// Profile links keyed by platform, e.g. `github`.
pub type SocialLinks = BTreeMap<String, String>;

/// A personal project shown on a member's own profile page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalProject {
    pub name: String,
    pub details: String,
    #[serde(default)]
    pub image: String,
}

/// Role governing which screens and actions a member can reach.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mentor" => Some(Role::Mentor),
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Ranks that may be held under this role. Admins carry no rank.
    pub fn ranks(&self) -> &'static [Rank] {
        match self {
            Role::Mentor => &[
                Rank::Founder,
                Rank::Cofounder,
                Rank::Director,
                Rank::Head,
                Rank::Instructor,
                Rank::Researcher,
            ],
            Role::Student => &[Rank::Fypstudent, Rank::Internee, Rank::Alumni],
            Role::Admin => &[],
        }
    }

    pub fn accepts(&self, rank: Rank) -> bool {
        self.ranks().contains(&rank)
    }
}

/// Rank within a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Founder,
    Cofounder,
    Director,
    Head,
    Instructor,
    Researcher,
    Fypstudent,
    Internee,
    Alumni,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Founder => "founder",
            Rank::Cofounder => "cofounder",
            Rank::Director => "director",
            Rank::Head => "head",
            Rank::Instructor => "instructor",
            Rank::Researcher => "researcher",
            Rank::Fypstudent => "fypstudent",
            Rank::Internee => "internee",
            Rank::Alumni => "alumni",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "founder" => Some(Rank::Founder),
            "cofounder" => Some(Rank::Cofounder),
            "director" => Some(Rank::Director),
            "head" => Some(Rank::Head),
            "instructor" => Some(Rank::Instructor),
            "researcher" => Some(Rank::Researcher),
            "fypstudent" => Some(Rank::Fypstudent),
            "internee" => Some(Rank::Internee),
            "alumni" => Some(Rank::Alumni),
            _ => None,
        }
    }

    /// Human-readable label, e.g. `FYP Student`.
    pub fn label(&self) -> &'static str {
        match self {
            Rank::Founder => "Founder",
            Rank::Cofounder => "Cofounder",
            Rank::Director => "Director",
            Rank::Head => "Head",
            Rank::Instructor => "Instructor",
            Rank::Researcher => "Researcher",
            Rank::Fypstudent => "FYP Student",
            Rank::Internee => "Internee",
            Rank::Alumni => "Alumni",
        }
    }
}

/// An approved lab member. The id is shared with the member's credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    pub is_active_member: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social: SocialLinks,
    #[serde(default)]
    pub projects: Vec<PersonalProject>,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Request body for an admin-created account (no approval step).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub is_active_member: bool,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social: SocialLinks,
    #[serde(default)]
    pub projects: Vec<PersonalProject>,
}

/// Request body for a profile update. Email and username are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub is_active_member: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    /// An empty string clears the picture
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub social: Option<SocialLinks>,
    #[serde(default)]
    pub projects: Option<Vec<PersonalProject>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Parsed profile changes handed to the repository. `email` and `user_name`
/// are only compared against the stored values.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub role: Option<Role>,
    pub rank: Option<Rank>,
    pub is_active_member: Option<bool>,
    pub description: Option<String>,
    pub profile_pic: Option<String>,
    pub skills: Option<Vec<String>>,
    pub social: Option<SocialLinks>,
    pub projects: Option<Vec<PersonalProject>>,
    pub expected_version: Option<i64>,
}

/// A validated account ready to be written together with its credential.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: String,
    pub email: String,
    pub role: Role,
    pub rank: Option<Rank>,
    pub is_active_member: bool,
    pub description: String,
    pub profile_pic: Option<String>,
    pub skills: Vec<String>,
    pub social: SocialLinks,
    pub projects: Vec<PersonalProject>,
    pub password_hash: String,
}

/// Login with either email or username.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "userName")]
    pub identifier: String,
    pub password: String,
}

/// Public portfolio view of an active member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMember {
    pub id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_label: Option<&'static str>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    pub skills: Vec<String>,
    pub social: SocialLinks,
    pub projects: Vec<PersonalProject>,
}

impl From<User> for PublicMember {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            rank: user.rank,
            rank_label: user.rank.map(|r| r.label()),
            description: user.description,
            profile_pic: user.profile_pic,
            skills: user.skills,
            social: user.social,
            projects: user.projects,
        }
    }
}
