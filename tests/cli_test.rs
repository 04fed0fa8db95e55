mod common;

use assert_cmd::prelude::*;
use common::payroll;
use predicates::prelude::*;

#[test]
fn test_salary_for_month() -> Result<(), Box<dyn std::error::Error>> {
    payroll()
        .args(["salary", "--trainer", "1", "--month", "2024-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Aida Bekova: 960 som for 1 session(s), 2024-05-01 to 2024-05-31",
        ));
    Ok(())
}

#[test]
fn test_salary_defaults_to_current_month() -> Result<(), Box<dyn std::error::Error>> {
    payroll()
        .args(["--currency", "KGS", "salary", "--trainer", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bakyt Osmonov: 720 KGS"));
    Ok(())
}

#[test]
fn test_salary_for_explicit_range() -> Result<(), Box<dyn std::error::Error>> {
    payroll()
        .args(["salary", "--trainer", "1"])
        .args(["--from", "2024-04-01", "--to", "2024-05-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1260 som for 2 session(s)"));
    Ok(())
}

#[test]
fn test_salary_rejects_bad_input() {
    payroll()
        .args(["salary", "--trainer", "1"])
        .args(["--from", "2024-05-10", "--to", "2024-05-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));

    payroll()
        .args(["salary", "--trainer", "42", "--month", "2024-05"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trainer 42 not found"));

    payroll()
        .args(["--utc-offset", "20", "salary", "--trainer", "1"])
        .assert()
        .failure();
}

#[test]
fn test_statement_csv() {
    payroll()
        .args(["statement", "--trainer", "1"])
        .args(["--from", "2024-04-01", "--to", "2024-05-31"])
        .assert()
        .success()
        .stdout(
            "date,day,offering,attendance,amount\n\
             2024-04-29,mon,Yoga,3,300\n\
             2024-05-09,thu,Yoga,8,960\n",
        );
}

#[test]
fn test_report_csv() {
    payroll()
        .args(["report", "--from", "2024-05-01", "--to", "2024-05-31"])
        .assert()
        .success()
        .stdout(
            "trainer,name,sessions,total\n\
             1,Aida Bekova,1,960\n\
             2,Bakyt Osmonov,1,720\n",
        );
}

#[test]
fn test_record_attendance() {
    payroll()
        .args(["record", "--slot", "3", "--date", "2024-05-15", "--count", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "offering 2: 9 attended on 2024-05-15 (wed)",
        ));

    payroll()
        .args(["record", "--slot", "99", "--date", "2024-05-15", "--count", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("schedule slot 99 not found"));
}

#[test]
fn test_slots_for_date() {
    payroll()
        .args(["slots", "--trainer", "1", "--date", "2024-05-09"])
        .assert()
        .success()
        .stdout("2\tYoga 18:00-19:00\n");

    payroll()
        .args(["slots", "--trainer", "1", "--date", "2024-05-08"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_chat_replay() {
    payroll()
        .args(["chat", "tests/fixtures/chat.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "tg-1: Your phone number was not found. Use /start\n\
             tg-1: Please send your phone number.\n\
             tg-1: Your phone number has been saved.\n\
             tg-1: Your classes for today:\n\
             tg-1:   [Yoga 18:00-19:00] att:1:2024-05-06\n\
             tg-1: Enter the number of attendees for the class on 2024-05-06.\n\
             tg-1: Please enter a number.\n\
             tg-1: Attendance recorded: 5 attended on 2024-05-06 (mon)\n\
             tg-1: Your salary for the current month is: 1460 som\n",
        ))
        .stdout(predicate::str::contains(
            "tg-2: This phone number is linked to another account.\n\
             tg-2: Sorry, I don't understand you.\n",
        ))
        .stderr(predicate::str::contains("Error processing chat event"));
}

#[test]
fn test_missing_roster_fails() {
    let mut cmd = std::process::Command::new(assert_cmd::cargo_bin!("trainer-payroll"));
    cmd.args(["--roster", "tests/fixtures/absent.json", "report"])
        .args(["--from", "2024-05-01", "--to", "2024-05-31"])
        .assert()
        .failure();
}
