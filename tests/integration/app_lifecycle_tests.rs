/*!
 * File-level tests for the application controller
 */

use anyhow::Result;
use std::sync::Arc;

use slice_translator::app_controller::{output_path_for, Controller, RunSummary};
use slice_translator::errors::{ProviderError, TranslationError};
use slice_translator::providers::mock::MockTranslator;
use slice_translator::translation::CancellationToken;
use crate::common;

fn controller(mock: &MockTranslator, tokens_per_slice: usize) -> Controller {
    Controller::with_translator(common::test_config(tokens_per_slice), Arc::new(mock.clone()))
}

#[tokio::test]
async fn test_translateFile_shouldWriteTranslatedCopyNextToInput() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "article.md", common::sample_document())?;
    let mock = MockTranslator::identity();

    let output = controller(&mock, 32).translate_file(&input, false).await?;

    let output = output.expect("output should be written");
    assert_eq!(output, temp_dir.path().join("article-translated.md"));
    assert_eq!(std::fs::read_to_string(&output)?, common::sample_document());
    assert!(mock.call_count() > 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "Hello.")?;
    let existing = common::create_test_file(temp_dir.path(), "notes-translated.txt", "old")?;
    let mock = MockTranslator::prefixing("new ");
    let controller = controller(&mock, 1024);

    assert_eq!(controller.translate_file(&input, false).await?, None);
    assert_eq!(std::fs::read_to_string(&existing)?, "old");
    assert_eq!(mock.call_count(), 0);

    assert_eq!(controller.translate_file(&input, true).await?, Some(existing.clone()));
    assert_eq!(std::fs::read_to_string(&existing)?, "new Hello.");
    Ok(())
}

/// Timeout on slice 2 of 5: the run fails and nothing is written
#[tokio::test]
async fn test_translateFile_withFailingSlice_shouldLeaveNoOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "five.txt", common::five_paragraphs())?;
    let mock = MockTranslator::failing_at(2, ProviderError::TimeoutError("gave up".into()));

    let error = controller(&mock, 5).translate_file(&input, false).await.unwrap_err();

    let cause = error.downcast_ref::<TranslationError>().expect("translation error in chain");
    assert_eq!(cause.slice_index(), Some(2));
    assert!(format!("{:#}", error).contains("slice 2"));
    assert!(!output_path_for(&input).exists());
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withInvalidUtf8_shouldFailWithoutRequests() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("binary.dat");
    std::fs::write(&input, [0x48, 0x69, 0xc3, 0x28])?;
    let mock = MockTranslator::identity();

    let error = controller(&mock, 1024).translate_file(&input, false).await.unwrap_err();

    assert!(matches!(
        error.downcast_ref::<TranslationError>(),
        Some(TranslationError::Segmentation(_))
    ));
    assert_eq!(mock.call_count(), 0);
    assert!(!output_path_for(&input).exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withCrLfAndBom_shouldPreserveThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = "\u{feff}Title\r\n\r\nBody line one.\r\nBody line two.\r\n";
    let input = common::create_test_file(temp_dir.path(), "win.txt", source)?;
    let mock = MockTranslator::identity();

    let output = controller(&mock, 1024).translate_file(&input, false).await?.expect("written");

    assert_eq!(std::fs::read_to_string(output)?, source);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withMissingInput_shouldFail() {
    let mock = MockTranslator::identity();
    let result = controller(&mock, 1024)
        .translate_file(std::path::Path::new("/definitely/not/here.txt"), false)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_shouldCountOutcomesPerFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let good = common::create_test_file(temp_dir.path(), "a.txt", "Fine.")?;
    let done = common::create_test_file(temp_dir.path(), "b.txt", "Done.")?;
    common::create_test_file(temp_dir.path(), "b-translated.txt", "Fertig.")?;
    let missing = temp_dir.path().join("c.txt");
    let mock = MockTranslator::identity();

    let summary = controller(&mock, 1024).run(&[good, done, missing], false).await;

    assert_eq!(summary, RunSummary { translated: 1, skipped: 1, failed: 1 });
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelled_shouldStopBeforeNextFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "a.txt", "Fine.")?;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mock = MockTranslator::identity();

    let summary = controller(&mock, 1024)
        .with_cancellation(cancel)
        .run(&[input.clone()], false)
        .await;

    assert_eq!(summary, RunSummary::default());
    assert!(!output_path_for(&input).exists());
    Ok(())
}
