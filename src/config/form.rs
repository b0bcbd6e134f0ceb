//! Applicant form rows submitted with a locked slot

use serde::{Deserialize, Serialize};

use super::user::{AdditionalApplication, UserConfig};
use crate::error::Result;
use crate::models::FormRow;

/// Localized form labels and fixed values, as printed on the service pages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Strings {
    pub residence_type_header: String,
    pub residence_type_temporary: String,
    pub residence_type_permanent: String,
    pub name_surname_header: String,
    pub citizenship_header: String,
    pub date_of_birth_header: String,
    pub phone_header: String,
    pub passport_header: String,
    pub residence_card_header: String,
    pub data_processing_header: String,
    pub data_processing_value: String,
    pub additional_applications_header: String,
    pub additional_application_type_child: String,
    pub additional_application_type_spouse: String,
    pub additional_application_type_children: String,
    pub case_number_header: String,
}

impl Strings {
    fn additional_application(&self, kind: AdditionalApplication) -> &str {
        match kind {
            AdditionalApplication::Child => &self.additional_application_type_child,
            AdditionalApplication::Spouse => &self.additional_application_type_spouse,
            AdditionalApplication::Children => &self.additional_application_type_children,
        }
    }
}

/// Rows of the residence application form
pub fn application_form(user: &UserConfig, strings: &Strings) -> Vec<FormRow> {
    let residence = if user.is_permanent_residence() {
        &strings.residence_type_permanent
    } else {
        &strings.residence_type_temporary
    };

    let mut rows = vec![
        FormRow::new(&strings.residence_type_header, residence),
        FormRow::new(&strings.name_surname_header, user.full_name()),
        FormRow::new(&strings.citizenship_header, &user.citizenship),
        FormRow::new(&strings.date_of_birth_header, &user.date_of_birth),
        FormRow::new(&strings.phone_header, &user.phone),
        FormRow::new(&strings.passport_header, &user.passport),
    ];

    if let Some(card) = user.residence_card.as_deref().filter(|c| !c.is_empty()) {
        rows.push(FormRow::new(&strings.residence_card_header, card));
    }

    rows.push(FormRow::new(
        &strings.data_processing_header,
        &strings.data_processing_value,
    ));

    rows.extend(user.additional_applications.iter().map(|&kind| {
        FormRow::new(
            &strings.additional_applications_header,
            strings.additional_application(kind),
        )
    }));

    rows
}

/// Rows of the head-of-department appointment form
///
/// # Errors
///
/// Returns `Error::Config` when the user file has no case number
pub fn head_of_department_form(user: &UserConfig, strings: &Strings) -> Result<Vec<FormRow>> {
    Ok(vec![
        FormRow::new(&strings.name_surname_header, user.full_name()),
        FormRow::new(&strings.phone_header, &user.phone),
        FormRow::new(&strings.case_number_header, user.case_number()?),
        FormRow::new(
            &strings.data_processing_header,
            &strings.data_processing_value,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResidenceType;

    fn strings() -> Strings {
        Strings {
            residence_type_header: "Rodzaj".into(),
            residence_type_temporary: "czasowy".into(),
            residence_type_permanent: "stały".into(),
            name_surname_header: "Nazwisko i imię".into(),
            citizenship_header: "Obywatelstwo".into(),
            date_of_birth_header: "Data urodzenia".into(),
            phone_header: "Telefon".into(),
            passport_header: "Paszport".into(),
            residence_card_header: "Karta pobytu".into(),
            data_processing_header: "Zgoda".into(),
            data_processing_value: "Tak".into(),
            additional_applications_header: "Dodatkowe".into(),
            additional_application_type_child: "dziecko".into(),
            additional_application_type_spouse: "małżonek".into(),
            additional_application_type_children: "dzieci".into(),
            case_number_header: "Sygnatura".into(),
        }
    }

    fn user() -> UserConfig {
        UserConfig {
            name: "Jan".into(),
            surname: "Kowalski".into(),
            citizenship: "UA".into(),
            date_of_birth: "1990-01-01".into(),
            phone: "500600700".into(),
            passport: "AB123".into(),
            ..UserConfig::default()
        }
    }

    #[test]
    fn test_application_form_minimal() {
        let rows = application_form(&user(), &strings());

        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], FormRow::new("Rodzaj", "stały"));
        assert_eq!(rows[1], FormRow::new("Nazwisko i imię", "Kowalski Jan"));
        assert_eq!(rows[6], FormRow::new("Zgoda", "Tak"));
    }

    #[test]
    fn test_application_form_full() {
        let mut user = user();
        user.residence_type = ResidenceType::Temporary;
        user.residence_card = Some("RC1".into());
        user.additional_applications = vec![
            AdditionalApplication::Spouse,
            AdditionalApplication::Children,
        ];

        let rows = application_form(&user, &strings());

        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].value, "czasowy");
        assert_eq!(rows[6], FormRow::new("Karta pobytu", "RC1"));
        assert_eq!(rows[8], FormRow::new("Dodatkowe", "małżonek"));
        assert_eq!(rows[9], FormRow::new("Dodatkowe", "dzieci"));
    }

    #[test]
    fn test_form_serializes_as_name_value_array() {
        let rows = application_form(&user(), &strings());
        let json = serde_json::to_string(&rows[..1]).unwrap();
        assert_eq!(json, r#"[{"name":"Nazwisko i imię","value":"Kowalski Jan"}]"#);
    }

    #[test]
    fn test_head_of_department_form() {
        let mut user = user();
        user.case_number = Some("SO-I.6151.1.2024".into());

        let rows = head_of_department_form(&user, &strings()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], FormRow::new("Sygnatura", "SO-I.6151.1.2024"));
    }

    #[test]
    fn test_head_of_department_form_requires_case_number() {
        let mut user = user();
        assert!(matches!(
            head_of_department_form(&user, &strings()),
            Err(crate::error::Error::Config(_))
        ));

        user.case_number = Some("   ".into());
        assert!(head_of_department_form(&user, &strings()).is_err());
    }
}
