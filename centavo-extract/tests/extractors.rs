//! Router-level extraction against recorded notification bodies.

use centavo_core::{Bank, Currency};
use centavo_extract::Router;

#[test]
fn test_bac_concrete_scenario() {
    // sender + body from a real BAC purchase notification
    let router = Router::new();
    let rec = router
        .extract(
            "notificacion@notificacionesbaccr.com",
            include_str!("fixtures/bac_new.html"),
        )
        .expect("should extract");

    assert_eq!(rec.merchant, "SUPER XYZ");
    assert_eq!(rec.date_dmy(), "05/01/2025");
    assert_eq!(rec.amount, 15000.00);
    assert_eq!(rec.currency, Currency::Crc);
    assert_eq!(rec.bank, Bank::Bac);
}

#[test]
fn test_each_sender_dispatches_to_its_format() {
    let router = Router::new();
    let cases: [(&str, &str, Bank); 5] = [
        (
            "bcrtarjestcta@bancobcr.com",
            include_str!("fixtures/bcr_card.html"),
            Bank::BcrCard,
        ),
        (
            "notificacion@notificacionesbaccr.com",
            include_str!("fixtures/bac_old.html"),
            Bank::Bac,
        ),
        (
            "info@promerica.fi.cr",
            include_str!("fixtures/promerica.html"),
            Bank::Promerica,
        ),
        (
            "informacion@credix.com",
            include_str!("fixtures/credix.html"),
            Bank::Credix,
        ),
        (
            "mensajero@bancobcr.com",
            include_str!("fixtures/bcr_sinpe.html"),
            Bank::BcrSinpe,
        ),
    ];

    for (sender, body, bank) in cases {
        let rec = router
            .extract(sender, body)
            .unwrap_or_else(|| panic!("{sender} should extract"));
        assert_eq!(rec.bank, bank);
        assert!(rec.amount > 0.0);
    }
}

#[test]
fn test_wrong_format_for_sender_is_no_match() {
    // A BCR card body delivered under the BAC sender shape-mismatches.
    let router = Router::new();
    assert!(
        router
            .extract(
                "notificacion@notificacionesbaccr.com",
                include_str!("fixtures/bcr_card.html"),
            )
            .is_none()
    );
}

#[test]
fn test_promotional_mail_is_no_match_not_error() {
    let router = Router::new();
    assert!(
        router
            .extract(
                "notificacion@notificacionesbaccr.com",
                include_str!("fixtures/bac_promo.html"),
            )
            .is_none()
    );
}

#[test]
fn test_unknown_sender_never_reaches_an_extractor() {
    let router = Router::new();
    assert!(
        router
            .extract("ofertas@tienda.example", include_str!("fixtures/bac_new.html"))
            .is_none()
    );
}
